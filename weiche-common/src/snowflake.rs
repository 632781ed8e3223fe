//! Time-ordered 64-bit identifiers.
//!
//! Bit layout, most significant first: 42 bits of milliseconds since an
//! [`Epoch`], 5 bits worker id, 5 bits process id, 12 bits sequence.
//! See <https://discord.com/developers/docs/reference#snowflakes>

use derive_where::derive_where;
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error as _, Unexpected},
};
use std::{
    fmt::{Display, Formatter},
    marker::PhantomData,
};
use thiserror::Error;
use time::{Duration, UtcDateTime};

pub const TIMESTAMP_BITS: u32 = 42;
pub const WORKER_ID_BITS: u32 = 5;
pub const PROCESS_ID_BITS: u32 = 5;
pub const SEQUENCE_BITS: u32 = 12;

const PROCESS_ID_SHIFT: u32 = SEQUENCE_BITS;
const WORKER_ID_SHIFT: u32 = PROCESS_ID_SHIFT + PROCESS_ID_BITS;
const TIMESTAMP_SHIFT: u32 = WORKER_ID_SHIFT + WORKER_ID_BITS;

pub const MAX_TIMESTAMP: u64 = mask(TIMESTAMP_BITS);
#[allow(clippy::cast_possible_truncation)]
pub const MAX_SEQUENCE: u16 = mask(SEQUENCE_BITS) as u16;

const fn mask(bits: u32) -> u64 {
    (1 << bits) - 1
}

pub trait Epoch {
    const EPOCH_TIME: UtcDateTime;
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Hash, Error)]
pub enum SnowflakeError {
    #[error("Time {0} lies before the snowflake epoch.")]
    BeforeEpoch(UtcDateTime),
    #[error("Timestamp does not fit into the snowflake layout anymore.")]
    TimestampOverflow,
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Node id {0} is out of range.")]
pub struct NodeIdOutOfRangeError(u8);

macro_rules! node_id {
    ($(#[$meta:meta])* $name:ident, $bits:ident) => {
        $(#[$meta])*
        #[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            #[allow(clippy::cast_possible_truncation)]
            pub const MAX: u8 = mask($bits) as u8;

            #[must_use]
            pub fn new(id: u8) -> Option<Self> {
                (id <= Self::MAX).then_some(Self(id))
            }

            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }
        }

        impl TryFrom<u8> for $name {
            type Error = NodeIdOutOfRangeError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                Self::new(value).ok_or(NodeIdOutOfRangeError(value))
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: Deserializer<'de>,
            {
                let inner = u8::deserialize(deserializer)?;
                Self::new(inner).ok_or_else(|| {
                    D::Error::invalid_value(Unexpected::Unsigned(inner.into()), &stringify!($name))
                })
            }
        }
    };
}

node_id!(
    /// Identifies the machine generating snowflakes.
    WorkerId,
    WORKER_ID_BITS
);
node_id!(
    /// Identifies the process on a worker generating snowflakes.
    ProcessId,
    PROCESS_ID_BITS
);

#[derive_where(
    Copy,
    Clone,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Debug,
    Default,
    Hash,
    Serialize,
    Deserialize
)]
#[serde(transparent)]
pub struct Snowflake<SnowflakeEpoch>(u64, #[serde(skip)] PhantomData<SnowflakeEpoch>);

impl<SnowflakeEpoch> Snowflake<SnowflakeEpoch> {
    #[must_use]
    pub fn new(inner: u64) -> Self {
        Self(inner, PhantomData)
    }

    /// Packs the parts. `millis` and `sequence` are truncated to their widths.
    #[must_use]
    pub fn compose(millis: u64, worker_id: WorkerId, process_id: ProcessId, sequence: u16) -> Self {
        let snowflake = (millis & MAX_TIMESTAMP) << TIMESTAMP_SHIFT
            | u64::from(worker_id.get()) << WORKER_ID_SHIFT
            | u64::from(process_id.get()) << PROCESS_ID_SHIFT
            | u64::from(sequence) & mask(SEQUENCE_BITS);

        Self::new(snowflake)
    }

    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn millis(self) -> u64 {
        self.0 >> TIMESTAMP_SHIFT
    }

    #[must_use]
    pub fn worker_id(self) -> WorkerId {
        #[allow(clippy::cast_possible_truncation)]
        WorkerId(((self.0 >> WORKER_ID_SHIFT) & mask(WORKER_ID_BITS)) as u8)
    }

    #[must_use]
    pub fn process_id(self) -> ProcessId {
        #[allow(clippy::cast_possible_truncation)]
        ProcessId(((self.0 >> PROCESS_ID_SHIFT) & mask(PROCESS_ID_BITS)) as u8)
    }

    #[must_use]
    pub fn sequence(self) -> u16 {
        #[allow(clippy::cast_possible_truncation)]
        let sequence = (self.0 & mask(SEQUENCE_BITS)) as u16;
        sequence
    }

    #[must_use]
    pub fn created_at(self) -> UtcDateTime
    where
        SnowflakeEpoch: Epoch,
    {
        SnowflakeEpoch::EPOCH_TIME + Duration::milliseconds(self.millis().cast_signed())
    }
}

impl<SnowflakeEpoch> Display for Snowflake<SnowflakeEpoch> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<SnowflakeEpoch> From<u64> for Snowflake<SnowflakeEpoch> {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}

impl<SnowflakeEpoch> From<Snowflake<SnowflakeEpoch>> for u64 {
    fn from(value: Snowflake<SnowflakeEpoch>) -> Self {
        value.get()
    }
}

fn millis_since_epoch<SnowflakeEpoch: Epoch>(time: UtcDateTime) -> Result<u64, SnowflakeError> {
    let millis = (time - SnowflakeEpoch::EPOCH_TIME).whole_milliseconds();
    if millis < 0 {
        return Err(SnowflakeError::BeforeEpoch(time));
    }

    u64::try_from(millis)
        .ok()
        .filter(|millis| *millis <= MAX_TIMESTAMP)
        .ok_or(SnowflakeError::TimestampOverflow)
}

/// Hands out strictly increasing snowflakes for one worker/process pair.
#[derive_where(Clone, Eq, PartialEq, Debug, Hash)]
pub struct SnowflakeGenerator<SnowflakeEpoch> {
    worker_id: WorkerId,
    process_id: ProcessId,
    last_millis: Option<u64>,
    sequence: u16,
    phantom_data: PhantomData<SnowflakeEpoch>,
}

impl<SnowflakeEpoch> SnowflakeGenerator<SnowflakeEpoch> {
    #[must_use]
    pub fn new(worker_id: WorkerId, process_id: ProcessId) -> Self {
        Self {
            worker_id,
            process_id,
            last_millis: None,
            sequence: 0,
            phantom_data: PhantomData,
        }
    }

    #[must_use]
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    #[must_use]
    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn generate_at(
        &mut self,
        time: UtcDateTime,
    ) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeError>
    where
        SnowflakeEpoch: Epoch,
    {
        let mut millis = millis_since_epoch::<SnowflakeEpoch>(time)?;

        match self.last_millis {
            // Clock stood still or went backwards: keep counting in the last millisecond.
            Some(last_millis) if millis <= last_millis => {
                millis = last_millis;
                if self.sequence == MAX_SEQUENCE {
                    millis += 1;
                    self.sequence = 0;
                } else {
                    self.sequence += 1;
                }
            }
            _ => self.sequence = 0,
        }

        if millis > MAX_TIMESTAMP {
            return Err(SnowflakeError::TimestampOverflow);
        }
        self.last_millis = Some(millis);

        Ok(Snowflake::compose(
            millis,
            self.worker_id,
            self.process_id,
            self.sequence,
        ))
    }

    pub fn generate(&mut self) -> Result<Snowflake<SnowflakeEpoch>, SnowflakeError>
    where
        SnowflakeEpoch: Epoch,
    {
        self.generate_at(UtcDateTime::now())
    }
}

#[cfg(test)]
mod tests {
    use crate::snowflake::{
        Epoch, MAX_SEQUENCE, MAX_TIMESTAMP, ProcessId, Snowflake, SnowflakeError,
        SnowflakeGenerator, WorkerId,
    };
    use time::{Duration, UtcDateTime, macros::utc_datetime};

    struct MillennialEpoch;
    impl Epoch for MillennialEpoch {
        const EPOCH_TIME: UtcDateTime = utc_datetime!(2000-1-1 00:00);
    }

    type TestSnowflake = Snowflake<MillennialEpoch>;

    #[test]
    fn node_id_ranges() {
        for legal_id in [0, 0xD, 0x1F] {
            assert!(WorkerId::new(legal_id).is_some());
            assert!(ProcessId::new(legal_id).is_some());
        }
        for illegal_id in [0x20, 0xF0, u8::MAX] {
            assert!(WorkerId::new(illegal_id).is_none());
            assert!(ProcessId::try_from(illegal_id).is_err());
        }

        assert_eq!(serde_json::from_str::<WorkerId>("31").unwrap().get(), 31);
        assert!(serde_json::from_str::<WorkerId>("32").is_err());
    }

    #[test]
    fn compose_and_decompose() {
        let worker_id = WorkerId::new(0b10101).unwrap();
        let process_id = ProcessId::new(0b10001).unwrap();

        let snowflake = TestSnowflake::compose(814_616_400_000, worker_id, process_id, 100);

        assert_eq!(snowflake.get(), 3_416_748_824_988_422_244);
        assert_eq!(snowflake.millis(), 814_616_400_000);
        assert_eq!(snowflake.worker_id(), worker_id);
        assert_eq!(snowflake.process_id(), process_id);
        assert_eq!(snowflake.sequence(), 100);
        assert_eq!(snowflake.created_at(), utc_datetime!(2025-10-24 10:20));
    }

    #[test]
    fn generator_counts_within_one_millisecond() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator =
            SnowflakeGenerator::<MillennialEpoch>::new(WorkerId::default(), ProcessId::default());

        let first = generator.generate_at(time).unwrap();
        let second = generator.generate_at(time).unwrap();

        assert_eq!(first.sequence(), 0);
        assert_eq!(second.sequence(), 1);
        assert_eq!(first.millis(), second.millis());
        assert!(first < second);

        let later = generator
            .generate_at(time + Duration::milliseconds(5))
            .unwrap();
        assert_eq!(later.sequence(), 0);
        assert_eq!(later.millis(), first.millis() + 5);
    }

    #[test]
    fn generator_borrows_next_millisecond_when_sequence_is_exhausted() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator =
            SnowflakeGenerator::<MillennialEpoch>::new(WorkerId::default(), ProcessId::default());

        let first = generator.generate_at(time).unwrap();
        let mut last = first;
        for _ in 0..MAX_SEQUENCE {
            let next = generator.generate_at(time).unwrap();
            assert!(next > last);
            last = next;
        }
        assert_eq!(last.sequence(), MAX_SEQUENCE);

        let overflowed = generator.generate_at(time).unwrap();
        assert_eq!(overflowed.millis(), first.millis() + 1);
        assert_eq!(overflowed.sequence(), 0);
        assert!(overflowed > last);
    }

    #[test]
    fn generator_survives_clock_going_backwards() {
        let time = utc_datetime!(2025-10-24 10:55);
        let mut generator =
            SnowflakeGenerator::<MillennialEpoch>::new(WorkerId::default(), ProcessId::default());

        let first = generator.generate_at(time).unwrap();
        let second = generator
            .generate_at(time - Duration::seconds(1))
            .unwrap();

        assert!(second > first);
        assert_eq!(second.millis(), first.millis());
    }

    #[test]
    fn generator_rejects_out_of_range_times() {
        let mut generator =
            SnowflakeGenerator::<MillennialEpoch>::new(WorkerId::default(), ProcessId::default());

        let before_epoch = MillennialEpoch::EPOCH_TIME - Duration::milliseconds(1);
        assert_eq!(
            generator.generate_at(before_epoch),
            Err(SnowflakeError::BeforeEpoch(before_epoch))
        );

        let too_late = MillennialEpoch::EPOCH_TIME
            + Duration::milliseconds((MAX_TIMESTAMP + 1).cast_signed());
        assert_eq!(
            generator.generate_at(too_late),
            Err(SnowflakeError::TimestampOverflow)
        );
    }
}
