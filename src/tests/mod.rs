mod business_logic;
mod commands;
mod formatter;
