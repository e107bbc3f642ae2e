use std::{fmt, str::FromStr};
use strum_macros::EnumIter;

#[derive(Debug, thiserror::Error)]
pub enum FluidError {
    #[error(
        r#"fluid "{0}" is not recognized, expected "glycerol", "rhodamine-1pc", "rhodamine-2pc", "water" or "air""#
    )]
    Fluid(String),
    #[error(r#"mode "{0}" is not recognized, expected "cooling" or "heating""#)]
    Mode(String),
}

/// Heat transfer fluid flowing in front of the PV cell
#[derive(EnumIter, Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Fluid {
    Glycerol,
    Rhodamine1pc,
    Rhodamine2pc,
    Water,
    Air,
}
impl Fluid {
    /// Name of the fluid column in the spectral intensity table
    pub fn column(&self) -> String {
        self.to_string()
    }
    pub fn to_pretty_string(&self) -> String {
        use Fluid::*;
        match self {
            Glycerol => "Glycerol".to_string(),
            Rhodamine1pc => "Rhodamine 1%".to_string(),
            Rhodamine2pc => "Rhodamine 2%".to_string(),
            Water => "Water".to_string(),
            Air => "Air".to_string(),
        }
    }
}
impl fmt::Display for Fluid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Fluid::*;
        match self {
            Glycerol => write!(f, "glycerol"),
            Rhodamine1pc => write!(f, "rhodamine-1pc"),
            Rhodamine2pc => write!(f, "rhodamine-2pc"),
            Water => write!(f, "water"),
            Air => write!(f, "air"),
        }
    }
}
impl FromStr for Fluid {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        use Fluid::*;
        match s.trim().to_lowercase().as_str() {
            "glycerol" => Ok(Glycerol),
            "rhodamine-1pc" => Ok(Rhodamine1pc),
            "rhodamine-2pc" => Ok(Rhodamine2pc),
            "water" => Ok(Water),
            "air" => Ok(Air),
            _ => Err(FluidError::Fluid(s.to_string())),
        }
    }
}

/// Whether the fluid is cooling down or heating up during the run
#[derive(EnumIter, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Mode {
    Cooling,
    Heating,
}
impl Mode {
    pub fn is_cooling(&self) -> bool {
        *self == Mode::Cooling
    }
}
impl From<bool> for Mode {
    /// `true` is [Mode::Cooling]
    fn from(is_cooling: bool) -> Self {
        if is_cooling {
            Mode::Cooling
        } else {
            Mode::Heating
        }
    }
}
impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Cooling => write!(f, "cooling"),
            Mode::Heating => write!(f, "heating"),
        }
    }
}
impl FromStr for Mode {
    type Err = FluidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cooling" => Ok(Mode::Cooling),
            "heating" => Ok(Mode::Heating),
            _ => Err(FluidError::Mode(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn fluid_names() {
        let names: Vec<_> = Fluid::iter().map(|f| f.to_string()).collect();
        assert_eq!(
            names,
            vec!["glycerol", "rhodamine-1pc", "rhodamine-2pc", "water", "air"]
        );
        for fluid in Fluid::iter() {
            assert_eq!(fluid.to_string().parse::<Fluid>().unwrap(), fluid);
        }
        assert!("ethanol".parse::<Fluid>().is_err());
    }

    #[test]
    fn mode_folder() {
        assert_eq!(Mode::from(true).to_string(), "cooling");
        assert_eq!(Mode::from(false).to_string(), "heating");
        assert_eq!("Heating".parse::<Mode>().unwrap(), Mode::Heating);
    }
}
