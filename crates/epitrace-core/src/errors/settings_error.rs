/// Dataset settings rehydration errors.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("group setting {group} references unknown station: {station}")]
    UnknownStation { group: String, station: String },

    #[error("tracing settings reference unknown station: {id}")]
    UnknownTracedStation { id: String },

    #[error("tracing settings reference unknown delivery: {id}")]
    UnknownTracedDelivery { id: String },

    #[error("multiple observed elements in tracing settings: {first} and {second}")]
    MultipleObserved { first: String, second: String },
}
