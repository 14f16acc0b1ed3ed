use jiff::civil::Date;

/// Age in completed years on `today`.
///
/// Returns `None` when the date of birth lies after `today`.
pub fn age_on(date_of_birth: Date, today: Date) -> Option<u32> {
    if date_of_birth > today {
        return None;
    }
    let mut years = i32::from(today.year()) - i32::from(date_of_birth.year());
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    u32::try_from(years).ok()
}
