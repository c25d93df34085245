pub mod settings;

pub use settings::{
    ApiConfig, AppConfig, NotificationsConfig, SalahConfig, TimetableApiConfig,
    TimetableSourceKind,
};
