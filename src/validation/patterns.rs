// Pattern strings for schema declarations

pub const OBJECT_ID_PATTERN: &str = "^[0-9a-f]{24}$";

pub const DATE_MMDDYYYY_PATTERN: &str =
    "^(1[0-2]|0[1-9])/(3[01]|[12][0-9]|0[1-9])/[0-9]{4}$";

pub const DATE_YYYY_MM_DD_PATTERN: &str =
    "^[0-9]{4}-(1[0-2]|0[1-9])-(3[01]|[12][0-9]|0[1-9])$";

pub const TIME_HHMM_PATTERN: &str =
    "^([0-9]|0[0-9]|1[0-9]|2[0-3]):[0-5][0-9]$";

pub const UUID4_PATTERN: &str =
    "^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$";
