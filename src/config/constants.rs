//! # hkrow Configuration Constants
//!
//! Constants are grouped by the subsystem that consumes them. Several inline
//! buffer sizes are derived from the group shape limits, so changing
//! `MAX_GROUP_DEPTH` may require revisiting the HKey buffers.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAX_GROUP_DEPTH (8)
//!       │
//!       └─> HKEY_INLINE_SEGMENTS (must be <=)
//!             Segments beyond the inline capacity spill to the heap.
//!
//! HKEY_INLINE_VALUES (8)
//!       │
//!       └─> Covers a two-column key per segment for the common
//!           customer/order/item style group without allocation.
//!
//! FIRST_TABLE_ORDINAL (1)
//!       │
//!       └─> Ordinals are encoded as order-preserving varints; keeping them
//!           small keeps every segment header to a single byte.
//! ```

// ============================================================================
// GROUP SHAPE
// ============================================================================

/// Ordinal assigned to the first table declared in a group. Subsequent tables
/// receive consecutive ordinals in declaration order.
pub const FIRST_TABLE_ORDINAL: u32 = 1;

/// Maximum nesting depth of a group (root table has depth 0).
pub const MAX_GROUP_DEPTH: usize = 8;

// ============================================================================
// INLINE BUFFER SIZES
// ============================================================================

/// Segments stored inline in an `HKeyShape` before spilling to the heap.
pub const HKEY_INLINE_SEGMENTS: usize = 4;

/// Column values stored inline in an `HKey` before spilling to the heap.
pub const HKEY_INLINE_VALUES: usize = 8;

/// Fields stored inline by value-holder rows.
pub const ROW_INLINE_FIELDS: usize = 8;

const _: () = assert!(
    HKEY_INLINE_SEGMENTS <= MAX_GROUP_DEPTH,
    "HKEY_INLINE_SEGMENTS must not exceed MAX_GROUP_DEPTH"
);

const _: () = assert!(
    HKEY_INLINE_VALUES >= HKEY_INLINE_SEGMENTS,
    "every inline segment needs at least one inline value slot"
);

// ============================================================================
// TYPES
// ============================================================================

/// Length used for `VARCHAR` columns declared without an explicit length.
pub const DEFAULT_STRING_LENGTH: u32 = 255;

// ============================================================================
// OPERATORS
// ============================================================================

/// Output rows buffered by the flatten operator for a single input row: a
/// left-join row for the previous parent, the kept input row and the joined
/// row.
pub const FLATTEN_MAX_PENDING: usize = 3;
