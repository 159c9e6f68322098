pub mod booking;
pub mod window;

pub use booking::AppointmentBookingService;
pub use window::DayWindow;
