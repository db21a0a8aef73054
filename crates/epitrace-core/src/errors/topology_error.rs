/// Topology editing errors.
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    #[error("cannot merge an empty station set")]
    EmptyMergeSet,

    #[error("duplicate member in merge set: {id}")]
    DuplicateMember { id: String },

    #[error("station already contained in a meta station: {id}")]
    AlreadyContained { id: String },

    #[error("station is not a meta station: {id}")]
    NotAMetaStation { id: String },

    #[error("meta station id collides with an existing element: {id}")]
    IdCollision { id: String },
}
