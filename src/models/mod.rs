pub mod reservation;
pub mod store;

pub use reservation::{
    Reservation, ReservationRequest, ReservationStatus, ReservationView,
};
pub use store::Store;
