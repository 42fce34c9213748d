//! Named fitting strategies

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which learning-rate policy a tuning run fits with
///
/// Parsing accepts the snake_case name (`one_cycle`), the CamelCase name
/// (`OneCycle`) or the fitting routine (`fit_one_cycle`); anything else fails
/// with [`Error::UnknownStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Cosine warm-up to the peak rate, then cosine annealing
    #[default]
    OneCycle,
    /// Flat rate, cosine annealing over the final quarter
    CosineAnnealing,
    /// Cosine cycles with warm restarts
    Sgdr,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::OneCycle, Strategy::CosineAnnealing, Strategy::Sgdr];

    /// Snake_case name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneCycle => "one_cycle",
            Self::CosineAnnealing => "cosine_annealing",
            Self::Sgdr => "sgdr",
        }
    }

    /// Name of the learner method this strategy runs
    pub fn fit_method(self) -> &'static str {
        match self {
            Self::OneCycle => "fit_one_cycle",
            Self::CosineAnnealing => "fit_flat_cos",
            Self::Sgdr => "fit_sgdr",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let key: String = s.chars().filter(|c| *c != '_' && *c != '-').flat_map(char::to_lowercase).collect();
        match key.as_str() {
            "onecycle" | "fitonecycle" => Ok(Self::OneCycle),
            "cosineannealing" | "fitflatcos" => Ok(Self::CosineAnnealing),
            "sgdr" | "fitsgdr" => Ok(Self::Sgdr),
            _ => Err(Error::UnknownStrategy { name: s.to_string() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepted_spellings() {
        assert_eq!("one_cycle".parse::<Strategy>().unwrap(), Strategy::OneCycle);
        assert_eq!("OneCycle".parse::<Strategy>().unwrap(), Strategy::OneCycle);
        assert_eq!("fit_flat_cos".parse::<Strategy>().unwrap(), Strategy::CosineAnnealing);
        assert_eq!("CosineAnnealing".parse::<Strategy>().unwrap(), Strategy::CosineAnnealing);
        assert_eq!("SGDR".parse::<Strategy>().unwrap(), Strategy::Sgdr);
    }

    #[test]
    fn test_unknown_strategy_fails_fast() {
        let err = "cyclic".parse::<Strategy>().unwrap_err();
        assert!(matches!(err, Error::UnknownStrategy { ref name } if name == "cyclic"));
    }

    #[test]
    fn test_display_round_trips() {
        for s in Strategy::ALL {
            assert_eq!(s.to_string().parse::<Strategy>().unwrap(), s);
            assert!(s.fit_method().starts_with("fit_"));
        }
        assert_eq!(Strategy::default(), Strategy::OneCycle);
    }

    #[test]
    fn test_serde_names() {
        let yaml = serde_yaml::to_string(&Strategy::CosineAnnealing).unwrap();
        assert_eq!(yaml.trim(), "cosine_annealing");
        let s: Strategy = serde_yaml::from_str("sgdr").unwrap();
        assert_eq!(s, Strategy::Sgdr);
        assert!(serde_yaml::from_str::<Strategy>("cyclic").is_err());
    }
}
