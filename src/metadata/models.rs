//! Shape of a remote metadata record, limited to what the merge consumes.

use serde::{Deserialize, Serialize};

/// A product as described by the remote source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMetadata {
    #[serde(default)]
    pub name: Option<String>,
    pub top_category: String,
    #[serde(default)]
    pub links: Option<Vec<RemoteLink>>,
    #[serde(default)]
    pub default_sku: Option<RemoteSku>,
}

/// A sub-item linked from a title (add-on, theme, season pass...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLink {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub top_category: Option<String>,
}

/// The purchasable configuration of a product.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSku {
    #[serde(default)]
    pub entitlements: Vec<RemoteEntitlement>,
}

/// Content granted by buying a bundle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntitlement {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// A metadata record together with the key it was fetched for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataEnvelope {
    pub key: String,
    pub metadata: RemoteMetadata,
}
