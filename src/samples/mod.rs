// samples/mod.rs
//! The tutorial samples, from a single triangle up to cascaded shadow maps.

mod common;

pub mod cascaded_shadow;
pub mod compute_blur;
pub mod cube;
pub mod deferred;
pub mod lighting;
pub mod shadow_mapping;
pub mod textured;
pub mod triangle;

use crate::app::Sample;
use crate::error::{RenderError, Result};
use crate::settings::RenderSettings;

/// Sample names in tutorial order.
pub const NAMES: [&str; 8] = [
    "triangle",
    "cube",
    "lighting",
    "textured",
    "shadow_mapping",
    "deferred",
    "compute_blur",
    "cascaded_shadow",
];

/// Builds the sample called `name`. A leading `NN_` ordinal is accepted.
pub fn by_name(name: &str, settings: &RenderSettings) -> Result<Box<dyn Sample>> {
    let trimmed = name
        .split_once('_')
        .filter(|(prefix, _)| !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()))
        .map_or(name, |(_, rest)| rest);

    let sample: Box<dyn Sample> = match trimmed {
        "triangle" => Box::new(triangle::TriangleSample::new()),
        "cube" => Box::new(cube::CubeSample::new()),
        "lighting" => Box::new(lighting::LightingSample::new()),
        "textured" => Box::new(textured::TexturedSample::new()),
        "shadow_mapping" => Box::new(shadow_mapping::ShadowMappingSample::new(settings)),
        "deferred" => Box::new(deferred::DeferredSample::new()),
        "compute_blur" => Box::new(compute_blur::ComputeBlurSample::new()),
        "cascaded_shadow" => Box::new(cascaded_shadow::CascadedShadowSample::new(settings)),
        _ => return Err(RenderError::UnknownSample(name.to_string())),
    };
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_name_resolves() {
        let settings = RenderSettings::default();
        for name in NAMES {
            let sample = by_name(name, &settings).unwrap();
            assert!(!sample.title().is_empty());
        }
    }

    #[test]
    fn ordinal_prefix_is_accepted() {
        let settings = RenderSettings::default();
        assert!(by_name("05_shadow_mapping", &settings).is_ok());
        assert!(by_name("08_cascaded_shadow", &settings).is_ok());
    }

    #[test]
    fn unknown_names_are_rejected() {
        let settings = RenderSettings::default();
        let err = by_name("teapot", &settings).err().unwrap();
        assert!(matches!(err, RenderError::UnknownSample(name) if name == "teapot"));
        // an underscore alone is not an ordinal
        assert!(by_name("compute", &settings).is_err());
    }
}
