use getset::{CopyGetters, Setters};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::encodings::HashFunctions;
use crate::kmers::SourceKind;
use crate::Error;

/// Everything needed to turn a sequence file into a sketch.
#[derive(Debug, Clone, PartialEq, Eq, TypedBuilder, CopyGetters, Setters, Serialize, Deserialize)]
pub struct ComputeParameters {
    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = 21u32)]
    ksize: u32,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = 1000u32)]
    scaled: u32,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(setter(into), default = HashFunctions::farm)]
    hash_function: HashFunctions,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = 42u32)]
    seed: u32,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = true)]
    skip_ambiguous: bool,

    /// Keep provenance for every retained hash.
    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default = false)]
    coordinates: bool,

    #[getset(get_copy = "pub", set = "pub")]
    #[builder(default)]
    #[serde(default)]
    source: SourceKind,
}

impl Default for ComputeParameters {
    fn default() -> Self {
        ComputeParameters::builder().build()
    }
}

impl ComputeParameters {
    pub fn validate(&self) -> Result<(), Error> {
        if self.ksize == 0 {
            return Err(Error::InvalidParameter {
                name: "ksize".into(),
                message: "must be positive".into(),
            });
        }
        if self.scaled == 0 {
            return Err(Error::InvalidParameter {
                name: "scaled".into(),
                message: "must be positive".into(),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(data: &str) -> Result<ComputeParameters, Error> {
        let params: ComputeParameters = serde_json::from_str(data)?;
        params.validate()?;
        Ok(params)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn defaults() {
        let params = ComputeParameters::default();
        assert_eq!(params.ksize(), 21);
        assert_eq!(params.scaled(), 1000);
        assert_eq!(params.hash_function(), HashFunctions::farm);
        assert_eq!(params.seed(), 42);
        assert!(params.skip_ambiguous());
        assert!(!params.coordinates());
        assert_eq!(params.source(), SourceKind::Lines);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn setters_and_validation() {
        let mut params = ComputeParameters::builder().ksize(0u32).build();
        assert!(matches!(
            params.validate(),
            Err(Error::InvalidParameter { .. })
        ));

        params.set_ksize(31);
        params.set_scaled(0);
        assert!(params.validate().is_err());

        params.set_scaled(1);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn json_roundtrip() {
        let params = ComputeParameters::builder()
            .ksize(11u32)
            .hash_function(HashFunctions::xx64)
            .source(SourceKind::Bytes)
            .build();

        let json = params.to_json().unwrap();
        assert!(json.contains("\"xx64\""));
        assert_eq!(ComputeParameters::from_json(&json).unwrap(), params);

        let bad = json.replace("\"scaled\":1000", "\"scaled\":0");
        assert!(ComputeParameters::from_json(&bad).is_err());
    }
}
