//! Wire shape of a batch job's `predictions` response.
//!
//! Only the fields the adapter reads are declared; everything else in the
//! payload is ignored. Required fields are still `Option` here so a missing
//! one can be reported with its location instead of a bare serde message.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct RawSourcePrediction {
    pub results: Option<RawResults>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawResults {
    #[serde(default)]
    pub predictions: Vec<RawFilePrediction>,
    #[serde(default)]
    pub errors: Vec<RawFileError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFileError {
    pub file: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFilePrediction {
    pub file: Option<String>,
    pub models: Option<RawModels>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawModels {
    pub prosody: Option<RawModel<RawProsodyPrediction>>,
    pub language: Option<RawModel<RawLanguagePrediction>>,
    pub face: Option<RawModel<RawFacePrediction>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub(crate) struct RawModel<P> {
    #[serde(default)]
    pub grouped_predictions: Vec<RawGroup<P>>,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "P: Deserialize<'de>"))]
pub(crate) struct RawGroup<P> {
    pub id: Option<String>,
    #[serde(default)]
    pub predictions: Vec<P>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawProsodyPrediction {
    pub text: Option<String>,
    pub time: Option<RawTimeSpan>,
    pub emotions: Option<Vec<RawEmotion>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLanguagePrediction {
    pub text: Option<String>,
    pub emotions: Option<Vec<RawEmotion>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFacePrediction {
    pub time: Option<f64>,
    pub emotions: Option<Vec<RawEmotion>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTimeSpan {
    pub begin: Option<f64>,
    pub end: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEmotion {
    pub name: String,
    pub score: f64,
}
