//! GPIO / peripheral pin assignments for the RoomHub board.
//!
//! `main` takes the matching typed pins from `Peripherals` and logs this
//! map at boot; keep the two in step.

// ---------------------------------------------------------------------------
// Actuators
// ---------------------------------------------------------------------------

/// Lamp relay, active HIGH.
pub const LAMP_GPIO: i32 = 1;
/// LEDC PWM output to the fan driver.
pub const FAN_PWM_GPIO: i32 = 8;

/// 28BYJ-48 via ULN2003, coils IN1..IN4.
pub const CURTAIN_IN1_GPIO: i32 = 9;
pub const CURTAIN_IN2_GPIO: i32 = 10;
pub const CURTAIN_IN3_GPIO: i32 = 11;
pub const CURTAIN_IN4_GPIO: i32 = 12;

// ---------------------------------------------------------------------------
// Sensors
// ---------------------------------------------------------------------------

/// DHT11 single-wire data line (open drain, external pull-up).
pub const DHT11_GPIO: i32 = 3;

/// MQ-2 analog output through a divider. ADC2 channel 3 on ESP32-S3.
pub const MQ2_ADC_GPIO: i32 = 14;

// ---------------------------------------------------------------------------
// UART1 to the display panel (UART0 carries the console)
// ---------------------------------------------------------------------------

pub const PANEL_UART_TX_GPIO: i32 = 17;
pub const PANEL_UART_RX_GPIO: i32 = 18;

// ---------------------------------------------------------------------------
// PWM configuration
// ---------------------------------------------------------------------------

/// LEDC timer resolution (bits). 8-bit gives 0 – 255 duty levels.
pub const PWM_RESOLUTION_BITS: u32 = 8;

/// Every GPIO the board drives or reads.
pub const ALL_GPIOS: [i32; 10] = [
    LAMP_GPIO,
    FAN_PWM_GPIO,
    CURTAIN_IN1_GPIO,
    CURTAIN_IN2_GPIO,
    CURTAIN_IN3_GPIO,
    CURTAIN_IN4_GPIO,
    DHT11_GPIO,
    MQ2_ADC_GPIO,
    PANEL_UART_TX_GPIO,
    PANEL_UART_RX_GPIO,
];
