use crate::assets::LoadError;

/// Failure of a single texture request.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TextureError {
    /// The graphics context changed between request and completion.
    #[error("graphics context changed while loading {0}")]
    ContextChanged(String),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("failed to allocate a GPU texture for {0}")]
    CreateFailed(String),
}

/// Atlas lookups fail only on programming/config errors.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AtlasError {
    #[error("unknown texture atlas `{0}`")]
    UnknownAtlas(String),
    #[error("texture atlas `{0}` has more cells than a frame index can address")]
    GridTooLarge(String),
}
