pub mod hx711;
