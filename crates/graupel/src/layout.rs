use crate::{Error, Result};

/// Number of usable bits in a packed ID.
///
/// Bit 63 is reserved so that IDs remain non-negative when stored in a
/// signed 64-bit integer (databases, protobuf `int64`, etc.).
pub const USABLE_BITS: u32 = 63;

/// Upper bound for the timestamp and node fields individually.
const MAX_FIELD_BITS: u32 = 30;

/// Bit-width split of the 63 usable ID bits among the timestamp, node
/// identifier, and sequence fields.
///
/// A `Layout` is an immutable value: construct it once via
/// [`Layout::standard`] or [`Layout::custom`] and share it freely. All
/// packing and unpacking arithmetic is derived from the three stored widths.
///
/// Fields are packed from **MSB to LSB**: timestamp, node id, sequence. For
/// the standard 41/10/12 split:
///
/// ```text
///  Bit Index:  63           63 62            22 21          12 11             0
///              +--------------+----------------+--------------+---------------+
///  Field:      | reserved (1) | timestamp (41) | node id (10) | sequence (12) |
///              +--------------+----------------+--------------+---------------+
///              |<----------- MSB ---------- 64 bits --------- LSB ----------->|
/// ```
///
/// A decomposition is only meaningful under the same layout that packed the
/// ID; the ID itself carries no layout tag.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Layout {
    timestamp_bits: u32,
    node_bits: u32,
    sequence_bits: u32,
}

impl Default for Layout {
    fn default() -> Self {
        Self::standard()
    }
}

impl Layout {
    /// Returns the standard 41/10/12 split: 41 timestamp bits (~69 years of
    /// milliseconds), 10 node bits (1024 nodes), 12 sequence bits (4096 IDs
    /// per node per millisecond).
    ///
    /// The constants satisfy every layout invariant by construction, so no
    /// validation path exists here.
    pub const fn standard() -> Self {
        Self {
            timestamp_bits: 41,
            node_bits: 10,
            sequence_bits: 12,
        }
    }

    /// Builds a layout from explicit bit widths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] when:
    ///
    /// - `sequence_bits` is zero
    /// - `node_bits` or `timestamp_bits` is outside `[1, 30]`
    /// - the three widths do not sum to exactly [`USABLE_BITS`] (63)
    ///
    /// # Example
    ///
    /// ```
    /// use graupel::Layout;
    ///
    /// let layout = Layout::custom(43, 8, 12)?;
    /// assert_eq!(layout.max_node_id(), 255);
    /// assert!(Layout::custom(41, 10, 13).is_err());
    /// # Ok::<(), graupel::Error>(())
    /// ```
    pub fn custom(timestamp_bits: u32, node_bits: u32, sequence_bits: u32) -> Result<Self> {
        if sequence_bits < 1 {
            return Err(Error::InvalidLayout {
                reason: format!("sequence_bits must be at least 1, but was {sequence_bits}"),
            });
        }
        if node_bits < 1 || node_bits > MAX_FIELD_BITS {
            return Err(Error::InvalidLayout {
                reason: format!(
                    "node_bits must be between 1 and {MAX_FIELD_BITS}, but was {node_bits}"
                ),
            });
        }
        if timestamp_bits < 1 || timestamp_bits > MAX_FIELD_BITS {
            return Err(Error::InvalidLayout {
                reason: format!(
                    "timestamp_bits must be between 1 and {MAX_FIELD_BITS}, but was {timestamp_bits}"
                ),
            });
        }
        let total = timestamp_bits + node_bits + sequence_bits;
        if total != USABLE_BITS {
            return Err(Error::InvalidLayout {
                reason: format!(
                    "bit widths must sum to {USABLE_BITS}, but {timestamp_bits} + {node_bits} + {sequence_bits} = {total}"
                ),
            });
        }
        Ok(Self {
            timestamp_bits,
            node_bits,
            sequence_bits,
        })
    }

    /// Width of the timestamp field in bits.
    pub const fn timestamp_bits(&self) -> u32 {
        self.timestamp_bits
    }

    /// Width of the node identifier field in bits.
    pub const fn node_bits(&self) -> u32 {
        self.node_bits
    }

    /// Width of the sequence field in bits.
    pub const fn sequence_bits(&self) -> u32 {
        self.sequence_bits
    }

    /// Returns the maximum representable timestamp value.
    pub const fn max_timestamp(&self) -> u64 {
        (1 << self.timestamp_bits) - 1
    }

    /// Returns the maximum representable node identifier.
    pub const fn max_node_id(&self) -> u64 {
        (1 << self.node_bits) - 1
    }

    /// Returns the maximum representable sequence value.
    pub const fn max_sequence(&self) -> u64 {
        (1 << self.sequence_bits) - 1
    }

    /// Number of bits the node field is shifted left in a packed ID.
    const fn node_shift(&self) -> u32 {
        self.sequence_bits
    }

    /// Number of bits the timestamp field is shifted left in a packed ID.
    const fn timestamp_shift(&self) -> u32 {
        self.node_bits + self.sequence_bits
    }

    /// Packs the three components into a single 64-bit ID.
    ///
    /// Each component is masked to its field width before shifting, so a
    /// value wider than its field has its high bits truncated. Debug builds
    /// assert against that: a timestamp past [`Self::max_timestamp`] means
    /// the layout's timestamp field has been outlived (roughly 69 years in
    /// the standard split) and truncation would silently produce colliding,
    /// non-sortable IDs.
    ///
    /// # Example
    ///
    /// ```
    /// use graupel::Layout;
    ///
    /// let layout = Layout::standard();
    /// let id = layout.pack(1000, 5, 7);
    /// let parts = layout.decompose(id);
    /// assert_eq!((parts.timestamp, parts.node_id, parts.sequence), (1000, 5, 7));
    /// ```
    pub const fn pack(&self, timestamp: u64, node_id: u64, sequence: u64) -> u64 {
        debug_assert!(timestamp <= self.max_timestamp(), "timestamp overflow");
        debug_assert!(node_id <= self.max_node_id(), "node id overflow");
        debug_assert!(sequence <= self.max_sequence(), "sequence overflow");

        let timestamp = (timestamp & self.max_timestamp()) << self.timestamp_shift();
        let node_id = (node_id & self.max_node_id()) << self.node_shift();
        let sequence = sequence & self.max_sequence();
        timestamp | node_id | sequence
    }

    /// Extracts the timestamp, node identifier, and sequence from a packed
    /// ID.
    ///
    /// Pure mask-and-shift arithmetic: total for every 64-bit input and
    /// never fails. An ID that was not produced under this layout decomposes
    /// into well-defined but meaningless field values.
    pub const fn decompose(&self, id: u64) -> SnowflakeParts {
        SnowflakeParts {
            timestamp: (id >> self.timestamp_shift()) & self.max_timestamp(),
            node_id: (id >> self.node_shift()) & self.max_node_id(),
            sequence: id & self.max_sequence(),
        }
    }
}

/// The three components of a Snowflake ID, as extracted by
/// [`Layout::decompose`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SnowflakeParts {
    /// Milliseconds (or the chosen tick unit) since the generator's epoch.
    pub timestamp: u64,
    /// Caller-assigned node identifier.
    pub node_id: u64,
    /// Per-tick counter.
    pub sequence: u64,
}
