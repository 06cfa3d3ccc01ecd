use sm_matrix::{DType, Strategy, VectorWidth};

use crate::error::{Result, VerifyError};

pub const ENV_SEED: &str = "SM_SEED";
pub const ENV_SIZES: &str = "SM_SIZES";
pub const ENV_DTYPES: &str = "SM_DTYPES";
pub const ENV_STRATEGIES: &str = "SM_STRATEGIES";
pub const ENV_VECTOR_WIDTH: &str = "SM_VECTOR_WIDTH";
pub const ENV_EPSILON: &str = "SM_EPSILON";

/// What a verification run multiplies and how results are compared.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifyConfig {
    /// Seed for the operand generator; equal seeds give equal operands.
    pub seed: u64,
    /// Square matrix sizes, each run as `size x size` @ `size x size`.
    pub sizes: Vec<usize>,
    pub dtypes: Vec<DType>,
    /// Strategies compared against the reference.
    pub strategies: Vec<Strategy>,
    pub vector_width: VectorWidth,
    /// Overrides the default `f32` comparison epsilon. Integer types always
    /// compare exactly.
    pub epsilon: Option<f32>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        VerifyConfig {
            seed: 42,
            sizes: vec![16, 32, 64, 128, 256, 512],
            dtypes: DType::ALL.to_vec(),
            strategies: Strategy::ALL.to_vec(),
            vector_width: VectorWidth::bits(64),
            epsilon: None,
        }
    }
}

impl VerifyConfig {
    /// Defaults overridden by the `SM_*` environment variables.
    pub fn from_env() -> Result<VerifyConfig> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each key:
    /// - `SM_SEED` -> seed
    /// - `SM_SIZES` -> sizes, comma separated
    /// - `SM_DTYPES` -> dtypes, comma separated (`i8,i16,i32,f32`)
    /// - `SM_STRATEGIES` -> strategies, comma separated
    /// - `SM_VECTOR_WIDTH` -> vector width in bits (0 leaves it unset)
    /// - `SM_EPSILON` -> f32 epsilon
    pub fn from_lookup<F>(lookup: F) -> Result<VerifyConfig>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = VerifyConfig::default();

        if let Some(raw) = lookup(ENV_SEED) {
            config.seed = parse_number(ENV_SEED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SIZES) {
            config.sizes = parse_list(ENV_SIZES, &raw, |s| s.parse::<usize>().ok())?;
        }
        if let Some(raw) = lookup(ENV_DTYPES) {
            config.dtypes = parse_list(ENV_DTYPES, &raw, DType::from_name)?;
        }
        if let Some(raw) = lookup(ENV_STRATEGIES) {
            config.strategies = parse_list(ENV_STRATEGIES, &raw, Strategy::from_name)?;
        }
        if let Some(raw) = lookup(ENV_VECTOR_WIDTH) {
            config.vector_width = VectorWidth::bits(parse_number(ENV_VECTOR_WIDTH, &raw)?);
        }
        if let Some(raw) = lookup(ENV_EPSILON) {
            let eps: f32 = parse_number(ENV_EPSILON, &raw)?;
            if !eps.is_finite() || eps < 0.0 {
                return Err(VerifyError::Config(format!(
                    "{} must be a finite, non-negative number, got {}",
                    ENV_EPSILON, raw
                )));
            }
            config.epsilon = Some(eps);
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations that cannot produce a single comparison.
    pub fn validate(&self) -> Result<()> {
        if self.sizes.is_empty() {
            return Err(VerifyError::Config("no matrix sizes given".to_string()));
        }
        if self.sizes.contains(&0) {
            return Err(VerifyError::Config("matrix sizes must be non-zero".to_string()));
        }
        if self.dtypes.is_empty() {
            return Err(VerifyError::Config("no element types given".to_string()));
        }
        if self.strategies.is_empty() {
            return Err(VerifyError::Config("no strategies given".to_string()));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| VerifyError::Config(format!("{}: cannot parse '{}'", key, raw)))
}

fn parse_list<T, F>(key: &str, raw: &str, parse: F) -> Result<Vec<T>>
where
    F: Fn(&str) -> Option<T>,
{
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            parse(s).ok_or_else(|| VerifyError::Config(format!("{}: unknown entry '{}'", key, s)))
        })
        .collect()
}
