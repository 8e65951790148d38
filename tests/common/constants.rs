//! Shared constants for end-to-end tests

// ============================================================================
// Catalog Keys
// ============================================================================

/// Primary title "Test Game"
pub const GAME_KEY: &str = "EP1234-CUSA00001_00-AAAAAAAAAAAAAAAA";

/// Add-on of "Test Game"
pub const DLC_1_KEY: &str = "EP1234-CUSA00001_00-DLC0000000000001";

/// Another add-on of "Test Game"
pub const DLC_2_KEY: &str = "EP1234-CUSA00001_00-DLC0000000000002";

/// Bundle shipping "Test Game" for two platform families
pub const BUNDLE_KEY: &str = "EP1234-CUSA00002_00-BUNDLE0000000000";

/// Handheld edition of "Test Game", dropped from bundles by default
pub const HANDHELD_GAME_KEY: &str = "EP1234-PCSB00001_00-AAAAAAAAAAAAAAAA";

// ============================================================================
// Categories
// ============================================================================

pub const GAME_CATEGORY: &str = "downloadable_game";
pub const ADD_ON_CATEGORY: &str = "add_on";
pub const BUNDLE_CATEGORY: &str = "bundle";

pub const GAME_CATEGORY_ID: i64 = 1;
pub const ADD_ON_CATEGORY_ID: i64 = 2;
pub const BUNDLE_CATEGORY_ID: i64 = 3;

// ============================================================================
// Default protection flags
// ============================================================================

pub const NAME_RO: u16 = 0x0001;
pub const CATEGORY_ID_RO: u16 = 0x0002;
pub const COMMENTS_RO: u16 = 0x0004;
