//! Housing prediction request and response models.

use serde::{Deserialize, Serialize};

/// Number of features a housing record carries.
pub const FEATURE_COUNT: usize = 8;

/// Feature column names, in the order the model consumes them.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "longitude",
    "latitude",
    "housing_median_age",
    "total_rooms",
    "total_bedrooms",
    "population",
    "households",
    "median_income",
];

/// Name of the regression target column in the raw dataset.
pub const TARGET_NAME: &str = "median_house_value";

/// A single housing record submitted for prediction.
///
/// All eight fields are required. Only type and presence are checked at the
/// HTTP boundary; there is no range validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HousingInput {
    /// Longitude of the block group.
    pub longitude: f64,
    /// Latitude of the block group.
    pub latitude: f64,
    /// Median age of the houses.
    pub housing_median_age: f64,
    /// Total number of rooms.
    pub total_rooms: f64,
    /// Total number of bedrooms.
    pub total_bedrooms: f64,
    /// Block group population.
    pub population: f64,
    /// Number of households.
    pub households: f64,
    /// Median income (tens of thousands of dollars).
    pub median_income: f64,
}

impl HousingInput {
    /// Returns the feature vector in [`FEATURE_NAMES`] order.
    ///
    /// # Example
    ///
    /// ```
    /// use housing_shared::models::HousingInput;
    ///
    /// let input = HousingInput {
    ///     longitude: -122.1,
    ///     latitude: 37.7,
    ///     housing_median_age: 30.0,
    ///     total_rooms: 2000.0,
    ///     total_bedrooms: 400.0,
    ///     population: 800.0,
    ///     households: 300.0,
    ///     median_income: 5.0,
    /// };
    /// assert_eq!(input.to_features()[0], -122.1);
    /// assert_eq!(input.to_features()[7], 5.0);
    /// ```
    #[must_use]
    pub fn to_features(&self) -> [f64; FEATURE_COUNT] {
        [
            self.longitude,
            self.latitude,
            self.housing_median_age,
            self.total_rooms,
            self.total_bedrooms,
            self.population,
            self.households,
            self.median_income,
        ]
    }
}

/// Response body of `POST /predict`.
///
/// Serializes to exactly one of `{"prediction": <number>}` or
/// `{"error": <string>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictResponse {
    /// The model produced a value.
    Success {
        /// Predicted median house value.
        prediction: f64,
    },
    /// The prediction failed; the message is generic.
    Failure {
        /// Caller-facing error message.
        error: String,
    },
}

impl PredictResponse {
    /// Generic message returned for any internal prediction failure.
    pub const FAILURE_MESSAGE: &'static str = "Prediction failed due to internal error.";

    /// Creates a success response.
    #[must_use]
    pub fn success(prediction: f64) -> Self {
        Self::Success { prediction }
    }

    /// Creates the generic failure response.
    #[must_use]
    pub fn failure() -> Self {
        Self::Failure {
            error: Self::FAILURE_MESSAGE.to_string(),
        }
    }

    /// Returns true for a success response.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
