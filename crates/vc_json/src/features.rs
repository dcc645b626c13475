use bitflags::bitflags;

bitflags! {
    /// Feature switches of serialization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SerializeFeatures: u16 {
        /// Wraps the top-level result in `{"<rootName>": ...}`.
        const WRAP_ROOT_VALUE = 1 << 0;
        /// Writes an object met again on the same path as `null` instead
        /// of failing with a cycle error.
        const WRITE_SELF_REFERENCES_AS_NULL = 1 << 1;
        /// Writes dates as epoch milliseconds instead of RFC 3339 text.
        const WRITE_DATES_AS_TIMESTAMPS = 1 << 2;
        /// Writes `NaN` as `0`.
        const WRITE_NAN_AS_ZERO = 1 << 3;
        /// Writes `+inf` as `9007199254740991`.
        const WRITE_POSITIVE_INFINITY_AS_NUMBER_MAX_SAFE_INTEGER = 1 << 4;
        /// Writes `-inf` as `-9007199254740991`.
        const WRITE_NEGATIVE_INFINITY_AS_NUMBER_MIN_SAFE_INTEGER = 1 << 5;
        /// Sorts unordered properties by output name.
        const SORT_PROPERTIES_ALPHABETICALLY = 1 << 6;
        /// Sorts map entries by their textual key.
        const ORDER_MAP_ENTRIES_BY_KEYS = 1 << 7;
        /// Properties without view membership belong to every view.
        const DEFAULT_VIEW_INCLUSION = 1 << 8;
    }
}

impl Default for SerializeFeatures {
    #[inline]
    fn default() -> Self {
        Self::WRITE_DATES_AS_TIMESTAMPS | Self::DEFAULT_VIEW_INCLUSION
    }
}

bitflags! {
    /// Feature switches of deserialization.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DeserializeFeatures: u16 {
        /// Expects the top-level input wrapped in `{"<rootName>": ...}`.
        const UNWRAP_ROOT_VALUE = 1 << 0;
        /// Fails on input keys no property accepts; dropped otherwise.
        const FAIL_ON_UNKNOWN_PROPERTIES = 1 << 1;
        /// Fails when a polymorphic value carries no discriminator; falls
        /// back to the default implementation or static type otherwise.
        const FAIL_ON_MISSING_TYPE_ID = 1 << 2;
        /// Fails when the discriminator names no known subtype; falls back
        /// like a missing one otherwise.
        const FAIL_ON_INVALID_SUBTYPE = 1 << 3;
        /// Fails on `null` for boolean and numeric properties.
        const FAIL_ON_NULL_FOR_PRIMITIVES = 1 << 4;
        /// Fails when a required creator argument is absent; binds `null`
        /// otherwise.
        const FAIL_ON_MISSING_CREATOR_PROPERTIES = 1 << 5;
        /// Reads a non-array value as a one-element list.
        const ACCEPT_SINGLE_VALUE_AS_ARRAY = 1 << 6;
        /// Properties without view membership belong to every view.
        const DEFAULT_VIEW_INCLUSION = 1 << 7;
    }
}

impl Default for DeserializeFeatures {
    #[inline]
    fn default() -> Self {
        Self::FAIL_ON_UNKNOWN_PROPERTIES
            | Self::FAIL_ON_MISSING_TYPE_ID
            | Self::FAIL_ON_INVALID_SUBTYPE
            | Self::FAIL_ON_MISSING_CREATOR_PROPERTIES
            | Self::DEFAULT_VIEW_INCLUSION
    }
}
