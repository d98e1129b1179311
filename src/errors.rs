pub use crate::imports::fields::MalformedValue;
pub use crate::imports::ImportError;
pub use crate::model::worksheets::WorksheetError;
pub use crate::model::{ConvertAmountError, FiatError};
