// Keine Standard-Bibliothek verwenden (Embedded System)
#![no_std]
// Kein normaler main() Einstiegspunkt (wird von esp_rtos bereitgestellt)
#![no_main]
// Verbiete mem::forget - gefährlich bei ESP HAL Types mit DMA-Buffern
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
// Verbiete große Stack-Frames (Stack ist auf Embedded Systemen begrenzt)
#![deny(clippy::large_stack_frames)]

// Heap Allocator (WiFi benötigt dynamischen Speicher)
extern crate alloc;

// Embassy Async Runtime
use embassy_executor::Spawner;
use embassy_net::{Config as NetConfig, Stack, StackResources};
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Timer};
use static_cell::{ConstStaticCell, StaticCell};

// ESP32-C6 HAL
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{DriveMode, Flex, OutputConfig, Pull};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;

// Backtrace bei Panic und println!() Support
use {esp_backtrace as _, esp_println as _};

// Projekt-Module und Konfiguration
use esp_keepitup::TelemetryChannel;
use esp_keepitup::config::{EXTRA_HEAP_SIZE, I2C_FREQUENCY_KHZ, WIFI_HEAP_SIZE};
use esp_keepitup::hal::HardwareRng;
use esp_keepitup::net::{HttpBuffers, RestClient, RestTcpState, SharedRestClient};
use esp_keepitup::tasks::{
    climate_task, connection_task, dhcp_task, federated_task, http_server_task, lastfm_task,
    lidar_task, mqtt_task, net_task, trainer_task,
};

// ESP-IDF App Descriptor - erforderlich für den Bootloader!
// Ohne diesen schlägt das Flashen mit "ESP-IDF App Descriptor missing" fehl
esp_bootloader_esp_idf::esp_app_desc!();

/// Main Entry Point
///
/// Initialisiert Hardware, WiFi, startet Embassy Runtime und spawnt Tasks.
/// Danach schläft main() - alle Arbeit läuft in Tasks.
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    // ESP32-C6 Konfiguration: CPU auf maximale Taktfrequenz (160 MHz)
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Heap Allocator initialisieren (WiFi braucht dynamischen Speicher!)
    // Zwei Bereiche: reclaimed RAM (64 KB) + extra (36 KB) = 100 KB total
    esp_alloc::heap_allocator!(
        #[esp_hal::ram(reclaimed)]
        size: WIFI_HEAP_SIZE
    );
    esp_alloc::heap_allocator!(size: EXTRA_HEAP_SIZE);

    // Embassy Runtime initialisieren (Timer + Software Interrupt)
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    let sw_interrupt =
        esp_hal::interrupt::software::SoftwareInterruptControl::new(peripherals.SW_INTERRUPT);
    esp_rtos::start(timg0.timer0, sw_interrupt.software_interrupt0);

    // WiFi Hardware initialisieren
    static RADIO_INIT: StaticCell<esp_radio::Controller> = StaticCell::new();
    let radio_init =
        RADIO_INIT.init(esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"));

    let (wifi_controller, wifi_interface) =
        esp_radio::wifi::new(radio_init, peripherals.WIFI, Default::default())
            .expect("Failed to initialize Wi-Fi");

    // Netzwerk-Stack erstellen
    // Random seed für TCP/IP Stack (von Hardware RNG, Radio ist aktiv)
    let mut rng = HardwareRng::new();
    let seed = rng.seed();

    // Static resources für embassy-net
    // 12 Sockets: REST-Client (1) + MQTT (1) + HTTP-Listener (4) + DHCP/DNS + WebSockets
    static RESOURCES: StaticCell<StackResources<12>> = StaticCell::new();
    let resources = RESOURCES.init(StackResources::new());

    // embassy-net erstellt Stack + Runner (nutzt STA interface für Client-Modus)
    let (stack, runner) = embassy_net::new(
        wifi_interface.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    // Stack muss 'static sein für Tasks
    static STACK: StaticCell<Stack<'static>> = StaticCell::new();
    let stack = &*STACK.init(stack);

    // Gemeinsamer REST-Client (Simulator, Firebase, Federated Server, Last.fm)
    // Die Buffer liegen direkt im .bss, nicht auf dem Stack
    static REST_TCP_STATE: StaticCell<RestTcpState> = StaticCell::new();
    static HTTP_BUFFERS: ConstStaticCell<HttpBuffers> = ConstStaticCell::new(HttpBuffers::new());
    static REST_CLIENT: StaticCell<SharedRestClient> = StaticCell::new();
    let rest = &*REST_CLIENT.init(Mutex::new(RestClient::new(
        *stack,
        REST_TCP_STATE.init(RestTcpState::new()),
        HTTP_BUFFERS.take(),
        rng,
    )));

    // Telemetrie-Channel (Broadcast: alle Subscribers bekommen jede Nachricht)
    // 4 Publisher: Trainer, LIDAR, Klima, Federated
    // 10 Subscriber: 1 MQTT + bis zu 9 WebSocket-Connections
    static TELEMETRY: StaticCell<TelemetryChannel> = StaticCell::new();
    let telemetry = &*TELEMETRY.init(TelemetryChannel::new());

    // I2C0 für den VL53L0X (SDA: GPIO6, SCL: GPIO7)
    let i2c = I2c::new(
        peripherals.I2C0,
        I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQUENCY_KHZ)),
    )
    .expect("Failed to initialize I2C0")
    .with_sda(peripherals.GPIO6)
    .with_scl(peripherals.GPIO7);

    // DHT11 Datenleitung (GPIO4): Open-Drain mit Pull-Up, Ein- und Ausgang
    let mut dht_pin = Flex::new(peripherals.GPIO4);
    dht_pin.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    dht_pin.set_input_enable(true);
    dht_pin.set_output_enable(true);

    // Spawn WiFi Tasks
    spawner.spawn(connection_task(wifi_controller)).unwrap();
    spawner.spawn(net_task(runner)).unwrap();
    spawner.spawn(dhcp_task(stack)).unwrap();

    // Spawn Sensor Tasks (LIDAR loggt zusätzlich nach Firebase)
    spawner
        .spawn(lidar_task(
            i2c,
            stack,
            rest,
            telemetry.publisher().unwrap(),
        ))
        .unwrap();
    spawner
        .spawn(climate_task(dht_pin, telemetry.publisher().unwrap()))
        .unwrap();

    // Spawn Lern-Tasks
    spawner
        .spawn(trainer_task(stack, rest, telemetry.publisher().unwrap()))
        .unwrap();
    spawner
        .spawn(federated_task(stack, rest, telemetry.publisher().unwrap()))
        .unwrap();
    spawner.spawn(lastfm_task(stack, rest)).unwrap();

    // Spawn MQTT Task (eigener Subscriber für alle Telemetrie-Nachrichten)
    spawner
        .spawn(mqtt_task(stack, telemetry.subscriber().unwrap()))
        .unwrap();

    // Spawn HTTP Server Tasks (4x für concurrent connections)
    // WebSocket-Subscriber werden pro Verbindung aus dem Channel erzeugt
    for task_id in 0..4 {
        spawner
            .spawn(http_server_task(task_id, stack, telemetry))
            .unwrap();
    }

    // Main-Loop: schläft (alle Arbeit läuft in Tasks)
    loop {
        Timer::after(Duration::from_secs(3600)).await;
    }
}
