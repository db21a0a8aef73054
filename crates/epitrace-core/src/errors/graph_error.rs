/// Graph store errors.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("station not found: {id}")]
    StationNotFound { id: String },

    #[error("delivery not found: {id}")]
    DeliveryNotFound { id: String },

    #[error("no station or delivery with id: {id}")]
    ElementNotFound { id: String },

    #[error("duplicate station id in dataset: {id}")]
    DuplicateStation { id: String },

    #[error("duplicate delivery id in dataset: {id}")]
    DuplicateDelivery { id: String },

    #[error("delivery {delivery} references missing station: {station}")]
    DanglingEndpoint { delivery: String, station: String },

    #[error("connection at station {station} references non-incident delivery: {delivery}")]
    InvalidConnection { station: String, delivery: String },

    #[error("graph inconsistency: {details}")]
    Inconsistency { details: String },
}
