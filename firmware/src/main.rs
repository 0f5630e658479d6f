//! RFID lock firmware for the STM32F411 "black pill".
//!
//! Wiring:
//!
//! | Peripheral          | Pins                                       |
//! |---------------------|--------------------------------------------|
//! | MFRC522 (SPI1)      | PA5 SCK, PA6 MISO, PA7 MOSI, PA4 NSS, PB1 RST |
//! | DS3231 RTC (I2C1)   | PB6 SCL, PB7 SDA                            |
//! | Servo (TIM3 CH1)    | PB4                                         |
//! | Buzzer              | PB0                                         |
//! | Force sensor (ADC1) | PA1                                         |
//! | USB serial          | PA11, PA12                                  |
#![no_std]
#![no_main]

use panic_halt as _;

#[rtic::app(device = stm32f4xx_hal::pac, peripherals = true)]
mod app {
    use ds323x::{ic::DS3231, interface::I2cInterface, Ds323x, Rtcc, Timelike};
    use heapless::spsc::{Consumer, Producer, Queue};
    use mfrc522::{comm::eh02::spi::SpiInterface, Initialized, Mfrc522};
    use rtt_target::{rprintln, rtt_init_print};
    use stm32f4xx_hal::{
        adc::{
            config::{AdcConfig, SampleTime},
            Adc,
        },
        gpio::{gpioa, gpiob, Alternate, AlternateOD, Analog, Output, PushPull},
        i2c::I2c,
        otg_fs::{UsbBus, UsbBusType, USB},
        pac,
        prelude::*,
        spi::{Mode, Phase, Polarity, Spi},
        timer::{Channel1, CounterMs, PwmChannel},
    };
    use ufmt::uwrite;
    use usb_device::{bus::UsbBusAllocator, prelude::*};

    use rfid_lock_firmware::{
        config::DeviceConfig,
        device::{Device, Inputs, ScanEvent},
        errors::Error,
        lock::ServoLock,
        log_line::{write_log_line, LogLine, TimeOfDay},
        pressure::PressureReading,
        serial::{
            receive_commands, BufferedSerialPort, SerialWriter, SERIAL_READ_BUFFER_BYTES,
            SERIAL_WRITE_BUFFER_BYTES,
        },
        uid::{AllowList, TagUid},
    };

    /// Tags that may open the lock
    const AUTHORIZED_UIDS: &[&str] = &["73 C9 2D 20"];
    const ALLOW_LIST_CAPACITY: usize = 8;

    const CONFIG: DeviceConfig = DeviceConfig::new();

    const COMMAND_QUEUE_LEN: usize = 16;
    const ERROR_QUEUE_LEN: usize = 8;

    type Buzzer = gpiob::PB0<Output<PushPull>>;
    type Servo = ServoLock<PwmChannel<pac::TIM3, 0>>;
    type Lock = Device<Servo, Buzzer, ALLOW_LIST_CAPACITY>;
    type RfidSpi = Spi<
        pac::SPI1,
        (
            gpioa::PA5<Alternate<5>>,
            gpioa::PA6<Alternate<5>>,
            gpioa::PA7<Alternate<5>>,
        ),
    >;
    type Rfid = Mfrc522<SpiInterface<RfidSpi, gpioa::PA4<Output<PushPull>>>, Initialized>;
    type Rtc = Ds323x<
        I2cInterface<
            I2c<pac::I2C1, (gpiob::PB6<AlternateOD<4>>, gpiob::PB7<AlternateOD<4>>)>,
        >,
        DS3231,
    >;
    type SerialPort = BufferedSerialPort<'static, UsbBusType>;

    #[shared]
    struct Shared {
        usb_dev: UsbDevice<'static, UsbBusType>,
        serial: SerialPort,
    }

    #[local]
    struct Local {
        device: Lock,
        rfid: Rfid,
        rtc: Rtc,
        adc: Adc<pac::ADC1>,
        pressure_pin: gpioa::PA1<Analog>,
        ticks: CounterMs<pac::TIM2>,
        commands_rx: Consumer<'static, u8, COMMAND_QUEUE_LEN>,
        commands_tx: Producer<'static, u8, COMMAND_QUEUE_LEN>,
    }

    #[init(local = [
        ep_memory: [u32; 1024] = [0; 1024],
        usb_bus: Option<UsbBusAllocator<UsbBusType>> = None,
        commands: Queue<u8, COMMAND_QUEUE_LEN> = Queue::new(),
    ])]
    fn init(ctx: init::Context) -> (Shared, Local, init::Monotonics) {
        rtt_init_print!();

        rprintln!("Initializing");

        // Clock setup
        let rcc = ctx.device.RCC.constrain();
        let clocks = rcc
            .cfgr
            .use_hse(25.MHz())
            .sysclk(48.MHz())
            .require_pll48clk()
            .freeze();

        rprintln!("Clock setup done");

        // GPIO setup
        let gpioa = ctx.device.GPIOA.split();
        let gpiob = ctx.device.GPIOB.split();

        // Free running millisecond tick for all timeouts
        let mut ticks = ctx.device.TIM2.counter_ms(&clocks);
        if ticks.start(u32::MAX.millis()).is_err() {
            rprintln!("Could not start tick counter");
        }

        // Buzzer and servo
        let buzzer = gpiob.pb0.into_push_pull_output();
        let pwm = ctx
            .device
            .TIM3
            .pwm_hz(Channel1::new(gpiob.pb4), 50.Hz(), &clocks)
            .split();
        let servo = ServoLock::new(pwm, &CONFIG);

        // Force sensor
        let adc = Adc::adc1(ctx.device.ADC1, true, AdcConfig::default());
        let pressure_pin = gpioa.pa1.into_analog();

        rprintln!("GPIO, PWM and ADC setup done");

        // I2C setup for the RTC. SCL is PB6 and SDA is PB7 (both with AF04).
        let scl = gpiob.pb6.into_alternate_open_drain();
        let sda = gpiob.pb7.into_alternate_open_drain();
        let i2c = I2c::new(ctx.device.I2C1, (scl, sda), 100.kHz(), &clocks);
        let rtc = Ds323x::new_ds3231(i2c);

        // SPI setup for the RFID reader. The reset pin is held high.
        let mut rfid_reset = gpiob.pb1.into_push_pull_output();
        rfid_reset.set_high();
        let spi = Spi::new(
            ctx.device.SPI1,
            (
                gpioa.pa5.into_alternate(),
                gpioa.pa6.into_alternate(),
                gpioa.pa7.into_alternate(),
            ),
            Mode {
                polarity: Polarity::IdleLow,
                phase: Phase::CaptureOnFirstTransition,
            },
            1.MHz(),
            &clocks,
        );
        let nss = gpioa.pa4.into_push_pull_output();
        let rfid = match Mfrc522::new(SpiInterface::new(spi).with_nss(nss)).init() {
            Ok(rfid) => rfid,
            Err(_) => {
                rprintln!("{}", Error::RfidInitFailed.as_str());
                panic!("RFID reader not responding");
            }
        };

        rprintln!("RTC and RFID reader setup done");

        // USB serial
        let usb = USB {
            usb_global: ctx.device.OTG_FS_GLOBAL,
            usb_device: ctx.device.OTG_FS_DEVICE,
            usb_pwrclk: ctx.device.OTG_FS_PWRCLK,
            pin_dm: gpioa.pa11.into_alternate(),
            pin_dp: gpioa.pa12.into_alternate(),
            hclk: clocks.hclk(),
        };
        let usb_bus: &'static UsbBusAllocator<UsbBusType> =
            ctx.local.usb_bus.insert(UsbBus::new(usb, ctx.local.ep_memory));
        let serial = SerialPort::new_with_store(
            usb_bus,
            [0u8; SERIAL_READ_BUFFER_BYTES],
            [0u8; SERIAL_WRITE_BUFFER_BYTES],
        );
        let usb_dev = UsbDeviceBuilder::new(usb_bus, UsbVidPid(0x16c0, 0x27dd))
            .manufacturer("dbrgn")
            .product("RFID Lock")
            .serial_number("0001")
            .device_class(usbd_serial::USB_CLASS_CDC)
            .build();
        let (commands_tx, commands_rx) = ctx.local.commands.split();

        rprintln!("USB setup done");

        let device = match AllowList::from_strs(AUTHORIZED_UIDS)
            .and_then(|allow_list| Device::new(CONFIG, allow_list, servo, buzzer))
        {
            Ok(device) => device,
            Err(e) => {
                rprintln!("Could not set up device: {}", e.as_str());
                panic!("Invalid device configuration");
            }
        };

        rprintln!("Done initializing");

        (
            Shared { usb_dev, serial },
            Local {
                device,
                rfid,
                rtc,
                adc,
                pressure_pin,
                ticks,
                commands_rx,
                commands_tx,
            },
            init::Monotonics(),
        )
    }

    #[idle(
        shared = [serial],
        local = [device, rfid, rtc, adc, pressure_pin, ticks, commands_rx,
                 errors: Queue<Error, ERROR_QUEUE_LEN> = Queue::new()],
    )]
    fn idle(mut ctx: idle::Context) -> ! {
        let device = ctx.local.device;
        let rfid = ctx.local.rfid;
        let rtc = ctx.local.rtc;
        let adc = ctx.local.adc;
        let pressure_pin = ctx.local.pressure_pin;
        let ticks = ctx.local.ticks;
        let commands = ctx.local.commands_rx;
        let errors = ctx.local.errors;

        ctx.shared.serial.lock(|serial| {
            let mut writer = SerialWriter(serial);
            if let Err(e) = uwrite!(writer, "System ready. Scan RFID tag...\r\n") {
                rprintln!("{}", e.as_str());
                e.log(errors);
            }
        });

        loop {
            let now = ticks.now().ticks();
            let pressure = PressureReading(adc.convert(pressure_pin, SampleTime::Cycles_480));
            let tag = if device.ready_for_scan(now) {
                read_tag(rfid)
            } else {
                None
            };
            let command = commands.dequeue();

            let inputs = Inputs {
                now,
                pressure,
                tag: tag.as_ref(),
                command,
            };
            match device.poll(inputs) {
                Ok(Some(event)) => {
                    if let Some(e) = event.fault {
                        rprintln!("{}", e.as_str());
                        e.log(errors);
                    }
                    let time = match read_time(rtc) {
                        Ok(time) => Some(time),
                        Err(e) => {
                            rprintln!("{}", e.as_str());
                            e.log(errors);
                            None
                        }
                    };
                    let written = ctx.shared.serial.lock(|serial| report(serial, &event, time));
                    if let Err(e) = written {
                        rprintln!("{}", e.as_str());
                        e.log(errors);
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    rprintln!("{}", e.as_str());
                    e.log(errors);
                }
            }
        }
    }

    #[task(binds = OTG_FS, shared = [usb_dev, serial], local = [commands_tx])]
    fn usb_interrupt(ctx: usb_interrupt::Context) {
        let commands = ctx.local.commands_tx;
        (ctx.shared.usb_dev, ctx.shared.serial).lock(|usb_dev, serial| {
            if usb_dev.poll(&mut [serial]) {
                receive_commands(serial, commands);
            }
        });
    }

    /// Poll the reader for a new tag and halt it once read.
    fn read_tag(rfid: &mut Rfid) -> Option<TagUid> {
        let atqa = rfid.reqa().ok()?;
        let uid = rfid.select(&atqa).ok()?;
        let tag = TagUid::from_bytes(uid.as_bytes()).ok();
        rfid.hlta().ok();
        tag
    }

    fn read_time(rtc: &mut Rtc) -> Result<TimeOfDay, Error> {
        let time = rtc.time().map_err(|_| Error::RtcReadTimeError)?;
        TimeOfDay::new(time.hour() as u8, time.minute() as u8, time.second() as u8)
            .ok_or(Error::RtcReadTimeError)
    }

    fn report(serial: &mut SerialPort, event: &ScanEvent, time: Option<TimeOfDay>) -> Result<(), Error> {
        let mut writer = SerialWriter(serial);
        let line = LogLine {
            uid: &event.uid,
            status: event.status,
            time,
        };
        write_log_line(&mut writer, &line)?;
        if event.reset {
            uwrite!(writer, "System reset: too many failed scans\r\n")?;
        }
        Ok(())
    }
}
