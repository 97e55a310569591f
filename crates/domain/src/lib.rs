mod date;
mod event;
mod shared;

pub use date::{
    get_month_length, is_active, is_leap_year, minute_slot, start_of_day, start_of_month,
    start_of_next_month,
};
pub use event::{Event, EventData, EventMsg};
pub use shared::entity::{Entity, InvalidIDError, ID};
