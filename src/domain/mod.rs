pub mod criteria;
pub mod dates;
pub mod status;
pub mod ticket;

pub use criteria::{SearchCriteria, TicketFilter};
pub use status::{StatusCategory, StatusLabel, StatusRegistry};
pub use ticket::{SubtaskInput, Ticket, TicketInput, TicketPatch, TicketType, TicketView};
