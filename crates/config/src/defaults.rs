pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    8080
}

pub fn default_currency() -> String {
    "INR".to_string()
}

pub fn default_fee_rate() -> f64 {
    0.01
}

pub fn default_quote_timeout_ms() -> u64 {
    2000
}

pub fn default_day_boundary_offset() -> String {
    "+05:30".to_string()
}

pub fn default_postgres_port() -> u16 {
    5432
}

pub fn default_ssl_mode() -> String {
    "prefer".to_string()
}

pub fn default_max_connections() -> u32 {
    10
}

pub fn default_connection_timeout() -> u64 {
    30
}

pub fn default_oracle_http_timeout_ms() -> u64 {
    1500
}
