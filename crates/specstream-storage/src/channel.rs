//! Logical channels and their physical column mapping.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// Logical measurement streams stored in a recording.
///
/// The enumeration is closed: wire values outside `0..Channel::COUNT` are
/// rejected by [`Channel::try_from`] before any storage call is made. The
/// string form is the canvas identifier used by the visualization client.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display,
)]
pub enum Channel {
    /// Left lateral chain.
    #[serde(rename = "LL")]
    #[strum(serialize = "LL")]
    LeftLateral,
    /// Left parasagittal chain.
    #[serde(rename = "LP")]
    #[strum(serialize = "LP")]
    LeftParasagittal,
    /// Right parasagittal chain.
    #[serde(rename = "RP")]
    #[strum(serialize = "RP")]
    RightParasagittal,
    /// Right lateral chain.
    #[serde(rename = "RL")]
    #[strum(serialize = "RL")]
    RightLateral,
}

impl Channel {
    /// Number of channels in the enumeration.
    pub const COUNT: usize = 4;

    /// Every channel in wire order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::LeftLateral,
        Self::LeftParasagittal,
        Self::RightParasagittal,
        Self::RightLateral,
    ];

    /// Position of the channel in wire order.
    #[must_use]
    pub const fn ordinal(self) -> usize {
        match self {
            Self::LeftLateral => 0,
            Self::LeftParasagittal => 1,
            Self::RightParasagittal => 2,
            Self::RightLateral => 3,
        }
    }

    /// Canvas identifier used by the visualization client.
    #[must_use]
    pub const fn canvas_id(self) -> &'static str {
        match self {
            Self::LeftLateral => "LL",
            Self::LeftParasagittal => "LP",
            Self::RightParasagittal => "RP",
            Self::RightLateral => "RL",
        }
    }
}

/// Error returned for wire values outside the channel enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("unknown channel {0}; expected 0..{count}", count = Channel::COUNT)]
pub struct UnknownChannel(pub i64);

impl TryFrom<i64> for Channel {
    type Error = UnknownChannel;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        usize::try_from(value)
            .ok()
            .and_then(|ordinal| Self::ALL.get(ordinal).copied())
            .ok_or(UnknownChannel(value))
    }
}

/// Errors raised when building a [`ChannelIndex`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelIndexError {
    /// Two channels were assigned the same column.
    #[error("channels {first} and {second} both map to column {column}")]
    DuplicateColumn {
        /// First channel using the column.
        first: Channel,
        /// Second channel using the column.
        second: Channel,
        /// Shared column.
        column: usize,
    },
}

/// Immutable mapping from [`Channel`] to physical column.
///
/// Built once at startup and handed to every component that resolves
/// channels. Lookups are a single array index by channel ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelIndex {
    columns: [usize; Channel::COUNT],
}

impl ChannelIndex {
    /// Builds an index from one column per channel, in wire order.
    pub fn new(columns: [usize; Channel::COUNT]) -> Result<Self, ChannelIndexError> {
        for (first_ordinal, first_column) in columns.iter().enumerate() {
            let duplicate = columns
                .iter()
                .enumerate()
                .skip(first_ordinal + 1)
                .find(|(_, column)| *column == first_column);
            if let Some((second_ordinal, _)) = duplicate {
                return Err(ChannelIndexError::DuplicateColumn {
                    first: Channel::ALL[first_ordinal],
                    second: Channel::ALL[second_ordinal],
                    column: *first_column,
                });
            }
        }
        Ok(Self { columns })
    }

    /// Physical column holding `channel`.
    #[must_use]
    pub const fn column(&self, channel: Channel) -> usize {
        self.columns[channel.ordinal()]
    }

    /// Channel stored in `column`, if any.
    #[must_use]
    pub fn channel_for_column(&self, column: usize) -> Option<Channel> {
        self.columns
            .iter()
            .position(|candidate| *candidate == column)
            .and_then(|ordinal| Channel::ALL.get(ordinal).copied())
    }
}

impl Default for ChannelIndex {
    /// Channels stored in wire order: LL, LP, RP, RL in columns 0 to 3.
    fn default() -> Self {
        Self {
            columns: [0, 1, 2, 3],
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(0, Channel::LeftLateral)]
    #[case(1, Channel::LeftParasagittal)]
    #[case(2, Channel::RightParasagittal)]
    #[case(3, Channel::RightLateral)]
    fn wire_values_map_to_channels(#[case] value: i64, #[case] expected: Channel) {
        assert_eq!(Channel::try_from(value), Ok(expected));
        assert_eq!(expected.ordinal(), usize::try_from(value).expect("small"));
    }

    #[rstest]
    #[case(-1)]
    #[case(4)]
    #[case(i64::MAX)]
    fn out_of_range_wire_values_are_rejected(#[case] value: i64) {
        assert_eq!(Channel::try_from(value), Err(UnknownChannel(value)));
    }

    #[test]
    fn canvas_ids_match_display_and_parse() {
        for channel in Channel::ALL {
            assert_eq!(channel.to_string(), channel.canvas_id());
            let parsed: Channel = channel.canvas_id().parse().expect("parse canvas id");
            assert_eq!(parsed, channel);
        }
    }

    #[test]
    fn default_index_is_identity() {
        let index = ChannelIndex::default();
        for channel in Channel::ALL {
            assert_eq!(index.column(channel), channel.ordinal());
            assert_eq!(index.channel_for_column(channel.ordinal()), Some(channel));
        }
        assert_eq!(index.channel_for_column(7), None);
    }

    #[test]
    fn custom_index_resolves_both_directions() {
        let index = ChannelIndex::new([3, 0, 2, 1]).expect("distinct columns");
        assert_eq!(index.column(Channel::LeftLateral), 3);
        assert_eq!(index.channel_for_column(1), Some(Channel::RightLateral));
    }

    #[test]
    fn duplicate_columns_are_rejected() {
        let error = ChannelIndex::new([0, 1, 1, 2]).expect_err("duplicate");
        assert_eq!(
            error,
            ChannelIndexError::DuplicateColumn {
                first: Channel::LeftParasagittal,
                second: Channel::RightParasagittal,
                column: 1,
            }
        );
    }
}
