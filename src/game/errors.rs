use thiserror::Error;

/// Errors that can arise while interacting with the game storage layer.
///
/// The pure economy functions never fail; everything here is either real
/// I/O trouble or a marketplace precondition refused before any write.
#[derive(Debug, Error)]
pub enum GameStoreError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around JSON serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when a market operation references an offer that is gone.
    #[error("offer not found: {0}")]
    OfferNotFound(String),

    /// Buying your own offer is refused.
    #[error("cannot buy your own offer")]
    OwnOffer,

    /// Buyer cannot cover the asking price.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// Listing an item the player does not own.
    #[error("item not owned: {0}")]
    ItemNotOwned(String),

    /// Cancelling an offer that belongs to another seller.
    #[error("offer belongs to another seller")]
    NotSeller,
}
