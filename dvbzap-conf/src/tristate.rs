//! Options that distinguish "never set" from "set to off".

/// A configuration switch that the parameter resolver may default later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tristate {
    /// Not given in the configuration.
    #[default]
    Undefined,
    /// Explicitly enabled.
    On,
    /// Explicitly disabled.
    Off,
}

impl Tristate {
    /// Interpret a numeric configuration value (`0` is off, anything else on).
    pub fn from_flag(value: i64) -> Self {
        if value != 0 {
            Tristate::On
        } else {
            Tristate::Off
        }
    }

    /// Replace `Undefined` by the given default; defined values are kept.
    ///
    /// Applying it twice gives the same result as applying it once.
    pub fn resolve(self, default_on: bool) -> Self {
        match self {
            Tristate::Undefined => Tristate::from(default_on),
            defined => defined,
        }
    }

    pub fn is_on(self) -> bool {
        self == Tristate::On
    }

    pub fn is_undefined(self) -> bool {
        self == Tristate::Undefined
    }
}

impl From<bool> for Tristate {
    fn from(value: bool) -> Self {
        if value {
            Tristate::On
        } else {
            Tristate::Off
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_only_touches_undefined() {
        assert_eq!(Tristate::Undefined.resolve(true), Tristate::On);
        assert_eq!(Tristate::Undefined.resolve(false), Tristate::Off);
        assert_eq!(Tristate::Off.resolve(true), Tristate::Off);
        assert_eq!(Tristate::On.resolve(false), Tristate::On);
    }

    #[test]
    fn test_resolve_is_fixed_point() {
        for value in [Tristate::Undefined, Tristate::On, Tristate::Off] {
            for default_on in [true, false] {
                let once = value.resolve(default_on);
                assert_eq!(once.resolve(default_on), once);
            }
        }
    }

    #[test]
    fn test_from_flag() {
        assert_eq!(Tristate::from_flag(0), Tristate::Off);
        assert_eq!(Tristate::from_flag(1), Tristate::On);
        assert_eq!(Tristate::from_flag(-3), Tristate::On);
        assert!(Tristate::default().is_undefined());
    }
}
