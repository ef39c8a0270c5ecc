//! Effect registry and factory functions.
//!
//! Maps an [`EffectType`] (or its registry name) to a configured effect
//! instance and to its default parameters.

use serde_json::Value;

use super::params::*;
use super::{
    Effect, EffectError, EffectType, HuxleyMeltEffect, SolidEffect, SpaceStationEffect,
    WaterEffect,
};
use crate::config::Params;

/// Create an effect from type and a JSON configuration mapping.
///
/// `Value::Null` selects the defaults. The mapping is validated against the
/// type's schema before the effect sees it.
///
/// # Example
/// ```
/// use pixelfx::effects::{create_effect, EffectType};
/// use serde_json::json;
///
/// let effect = create_effect(EffectType::Water, &json!({"bass_viscosity": 6})).unwrap();
/// assert_eq!(effect.effect_type(), EffectType::Water);
/// assert_eq!(effect.config()["bass_viscosity"], 6);
/// ```
pub fn create_effect(effect_type: EffectType, config: &Value) -> Result<Box<dyn Effect>, EffectError> {
    let effect: Box<dyn Effect> = match effect_type {
        EffectType::Water => Box::new(WaterEffect::new(WaterParams::from_config(config)?)),
        EffectType::HuxleyMelt => Box::new(HuxleyMeltEffect::new(HuxleyMeltParams::from_config(config)?)),
        EffectType::SpaceStation => Box::new(SpaceStationEffect::new(SpaceStationParams::from_config(config)?)),
        EffectType::Solid => Box::new(SolidEffect::new(SolidParams::from_config(config)?)),
    };
    log::debug!("Created {} effect", effect_type.name());
    Ok(effect)
}

/// Create an effect from its registry name.
///
/// # Example
/// ```
/// use pixelfx::effects::registry::create_effect_by_name;
/// use serde_json::Value;
///
/// assert!(create_effect_by_name("space_station", &Value::Null).is_ok());
/// assert!(create_effect_by_name("fireworks", &Value::Null).is_err());
/// ```
pub fn create_effect_by_name(name: &str, config: &Value) -> Result<Box<dyn Effect>, EffectError> {
    let effect_type = EffectType::from_str(name).ok_or_else(|| EffectError::UnknownType(name.to_string()))?;
    create_effect(effect_type, config)
}

/// Get default params for an effect type as a JSON mapping.
///
/// # Example
/// ```
/// use pixelfx::effects::{default_params, EffectType};
///
/// let params = default_params(EffectType::HuxleyMelt);
/// assert_eq!(params["strobe_width"], 10);
/// ```
pub fn default_params(effect_type: EffectType) -> Value {
    match effect_type {
        EffectType::Water => WaterParams::defaults(),
        EffectType::HuxleyMelt => HuxleyMeltParams::defaults(),
        EffectType::SpaceStation => SpaceStationParams::defaults(),
        EffectType::Solid => SolidParams::defaults(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_create_every_type_with_defaults() {
        for effect_type in EffectType::all() {
            let effect = create_effect(*effect_type, &Value::Null).unwrap();
            assert_eq!(effect.effect_type(), *effect_type);
            assert_eq!(effect.config(), default_params(*effect_type));
            assert!(!effect.is_active());
        }
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = create_effect(EffectType::HuxleyMelt, &json!({"strobe_rate": 4.0}));
        assert!(matches!(result, Err(EffectError::InvalidConfig(_))));
    }

    #[test]
    fn test_unknown_name() {
        let result = create_effect_by_name("plasma", &Value::Null);
        assert!(matches!(result, Err(EffectError::UnknownType(ref name)) if name == "plasma"));
    }

    #[test]
    fn test_names_and_categories() {
        let effect = create_effect_by_name("huxley_melt", &Value::Null).unwrap();
        assert_eq!(effect.name(), "Huxley Melt");
        assert_eq!(effect.category(), "Atmospheric");

        let effect = create_effect_by_name("solid", &Value::Null).unwrap();
        assert_eq!(effect.category(), "Non-Reactive");
        assert!(!effect.is_animated());
    }
}
