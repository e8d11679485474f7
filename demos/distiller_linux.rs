use std::{env, thread, time::Duration};

use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Gray8,
    prelude::*,
    primitives::{Circle, PrimitiveStyle},
    text::Text,
};
use epd_distiller::{
    frame::load_frame_dir,
    linux::{open_cdev, open_sysfs, Board},
    prelude::*,
};

// Shows a picture in 4 gray, the same picture dithered in 1-bit, a drawn
// screen and optionally an animation, then clears the panel.
//
// usage: distiller_linux <picture> [frame directory]
// SPI has to be enabled, the sysfs backend usually needs root.

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let picture = args.next().unwrap_or_else(|| "picture.png".into());
    let frame_dir = args.next();

    let config = Config::default();
    let settings = SpiSettings::default();
    match Board::detect()? {
        Board::RaspberryPi => run(open_sysfs(&settings, &config)?, &config, &picture, frame_dir),
        Board::Rockchip => run(open_cdev(&settings, &config)?, &config, &picture, frame_dir),
    }
}

fn run<D>(epd: D, config: &Config, picture: &str, frame_dir: Option<String>) -> Result<()>
where
    D: RefreshController + Send + 'static,
{
    let mut epd = SharedDisplay::new(epd, config);

    let mut frame = GreyscaleFrame::filled(WIDTH, HEIGHT, 0xFF);
    frame.paste_centered(&GreyscaleFrame::open(picture)?);

    println!("4 gray");
    epd.update(&frame, DisplayMode::FourGray)?;
    thread::sleep(Duration::from_secs(3));

    println!("1-bit dithered");
    epd.update(&frame, DisplayMode::OneBit { dither: true })?;
    thread::sleep(Duration::from_secs(3));

    println!("drawing");
    let mut canvas = Canvas::default();
    let style = MonoTextStyle::new(&FONT_10X20, Gray8::BLACK);
    let _ = Text::new("Distiller", Point::new(60, 100), style).draw(&mut canvas);
    let _ = Circle::new(Point::new(70, 180), 100)
        .into_styled(PrimitiveStyle::with_stroke(Gray8::BLACK, 4))
        .draw(&mut canvas);
    let drawing = canvas.into_frame();
    epd.update(&drawing, DisplayMode::OneBit { dither: false })?;

    if let Some(dir) = frame_dir {
        println!("animation from {}", dir);
        epd.start_animation(drawing, load_frame_dir(dir)?);
        thread::sleep(Duration::from_secs(5));
        epd.stop_animation();
    }

    println!("reflush");
    epd.reflush()?;

    println!("clear and power off");
    epd.clear(true)
}
