pub mod dua;
pub mod notification;
pub mod prayer;

pub use dua::{Ack, AiDua, AuthResponse, Category, ContactMessage, Dua, Favorite, Subcategory, User};
pub use notification::{
    NotificationCommand, NotificationPreferences, PrayerNotification, ScheduledNotification,
};
pub use prayer::{PrayerName, PrayerStatus, PrayerTimetable};
