use std::io::Write;

use anstyle::{AnsiColor, Style};

fn level_style(level: log::Level) -> Style {
    let color = match level {
        log::Level::Error => AnsiColor::Red,
        log::Level::Warn => AnsiColor::Yellow,
        log::Level::Info => AnsiColor::Green,
        log::Level::Debug => AnsiColor::Blue,
        log::Level::Trace => AnsiColor::Magenta,
    };
    Style::new().fg_color(Some(color.into())).bold()
}

fn build_logger(builder: &mut env_logger::Builder) -> &mut env_logger::Builder {
    builder.format(|buf, record| {
        let style = level_style(record.level());
        let dim = Style::new().dimmed();
        writeln!(
            buf,
            "{}{}{} {}{:<5}{} {}[{}:{}]{} {}",
            dim.render(),
            chrono::Local::now().format("%H:%M:%S%.3f"),
            dim.render_reset(),
            style.render(),
            record.level(),
            style.render_reset(),
            dim.render(),
            record.file().unwrap_or("unknown"),
            record.line().unwrap_or(0),
            dim.render_reset(),
            record.args()
        )
    })
}

/// 初始化全局 logger
///
/// 默认级别为 info，可以通过 `RUST_LOG` 覆盖，例如 `RUST_LOG=kestrel_gfx=trace`
pub fn init_log() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    build_logger(&mut builder).init();
}

/// 单元测试使用的 logger，可以重复调用
pub fn init_test_log() {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"));
    let _ = build_logger(&mut builder).is_test(true).try_init();
}
