//! Icinga side of the plugins: notification macros, API, Director baskets

pub mod api;
pub mod director;
pub mod notification;

pub use api::{Comment, IcingaApi};
pub use director::{notification_basket, DirectorBasket, NotificationBasketOptions};
pub use notification::{with_logging_fields, with_notification_fields, Notification};
