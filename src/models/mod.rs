pub mod item;
pub mod login_token;
pub mod rental;
pub mod stock_notification;
pub mod user;

pub use item::ItemDto;
pub use user::AccountDto;
