// HTML resume rendering over the shared paginator.

pub mod handlers;
pub mod html;
