use jiff::Timestamp;
use jiff::civil::Date;
use jiff::tz::TimeZone;

/// Source of "today" for date rules and of draft save times. Read on
/// every validation pass.
pub trait Clock: Send + Sync {
    fn today(&self) -> Date;

    fn now(&self) -> Timestamp;
}

/// Local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> Date {
        jiff::Zoned::now().date()
    }

    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Always reports the same day. `now` is midnight UTC on that day.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub Date);

impl Clock for FixedClock {
    fn today(&self) -> Date {
        self.0
    }

    fn now(&self) -> Timestamp {
        self.0
            .to_zoned(TimeZone::UTC)
            .map_or(Timestamp::UNIX_EPOCH, |zoned| zoned.timestamp())
    }
}
