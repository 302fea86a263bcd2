use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("Cannot define a conversion between identical units")]
    IdenticalUnits,

    #[error("Conversion quantity must be a positive number, got {0}")]
    NonPositiveQuantity(f64),

    #[error("Conversion is undefined: both quantities must be set")]
    Undefined,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitsSystemError {
    #[error("No conversion path between '{from}' and '{to}'")]
    NoConversionPath { from: String, to: String },

    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Reference quantity converts to zero grams")]
    ZeroReferenceQuantity,

    #[error(transparent)]
    Conversion(#[from] ConversionError),
}
