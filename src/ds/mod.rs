pub mod expiry_wheel;
pub mod ghost_list;
pub mod keyed_deque;
pub mod ordered_list;
pub mod slot_arena;

pub use expiry_wheel::{ExpiryWheel, WheelSlot, DEFAULT_BUCKET_COUNT};
pub use ghost_list::GhostList;
pub use keyed_deque::KeyedDeque;
pub use ordered_list::OrderedList;
pub use slot_arena::{SlotArena, SlotId};
