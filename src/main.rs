// main.rs — 事件循环、UI 面板与工作线程编排

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")] // 在 Release 模式下隐藏控制台窗口

mod api;
mod camera;
mod config;
mod i18n;
mod renderer;
mod sphere;
mod state;

use api::GenerationError;
use renderer::Renderer;
use sphere::CameraSphere;
use state::{AppState, EncodedImage, Event as AppEvent};

use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;

/// 参考图加载线程发回的消息：载荷 + 预览位图，或失败原因。
/// 无论成败都必发一条，接收端据此解除加载中状态。
type LoadedReference = Result<(EncodedImage, egui::ColorImage), String>;

/// 图片预览纹理（egui 纹理系统持有像素）。
#[derive(Default)]
struct Previews {
    reference: Option<egui::TextureHandle>,
    result: Option<egui::TextureHandle>,
}

/// 跨帧的 UI 状态：球面控件的手势、配置弹窗与草稿。
struct UiState {
    sphere: CameraSphere,
    show_config: bool,
    config_draft: config::ApiConfig,
    is_loading: bool,
}

fn main() {
    env_logger::init();

    let mut current_lang = i18n::resolve_lang_from_args();
    i18n::init(current_lang.clone());

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(&i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 800))
            .build(&event_loop)
            .unwrap(),
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()));

    let loaded = config::load();
    if let config::ConfigLoad::Corrupt(e) = &loaded {
        log::warn!("config file unreadable, falling back to defaults: {e}");
    }
    let mut app = AppState::new(loaded.into_config());

    let mut previews = Previews::default();
    let mut ui_state = UiState {
        sphere: CameraSphere::new(),
        show_config: false,
        config_draft: app.config.clone(),
        is_loading: false,
    };

    // 工作线程通道：参考图加载 + 生成请求
    let (ref_tx, ref_rx): (Sender<LoadedReference>, Receiver<LoadedReference>) = channel();
    let (gen_tx, gen_rx): (
        Sender<(u64, Result<EncodedImage, GenerationError>)>,
        Receiver<(u64, Result<EncodedImage, GenerationError>)>,
    ) = channel();

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        // 参考图加载结束（成功或失败都解除加载中）
        if let Ok(loaded) = ref_rx.try_recv() {
            ui_state.is_loading = false;
            match loaded {
                Ok((payload, preview)) => {
                    previews.reference = Some(renderer.egui_ctx.load_texture(
                        "reference",
                        preview,
                        egui::TextureOptions::LINEAR,
                    ));
                    app.apply(AppEvent::ReferenceLoaded(payload));
                }
                Err(e) => {
                    log::warn!("reference load failed: {e}");
                    alert(&i18n::tr("upload.failed"), &e);
                }
            }
        }

        // 生成请求完成
        if let Ok((id, outcome)) = gen_rx.try_recv() {
            if app.accepts_result(id) {
                match outcome {
                    Ok(img) => {
                        previews.result = decode_preview(&img).map(|p| {
                            renderer
                                .egui_ctx
                                .load_texture("result", p, egui::TextureOptions::LINEAR)
                        });
                        app.apply(AppEvent::GenerationSucceeded(img));
                    }
                    Err(e) => {
                        app.apply(AppEvent::GenerationFailed);
                        alert(&i18n::tr("error.generate_failed"), &e.to_string());
                    }
                }
            } else {
                // 过期响应：会话已重载或已被新请求替代
                log::info!("dropping stale generation result #{id}");
            }
        }

        match event {
            Event::WindowEvent { event, .. } => {
                // 先让 egui 处理事件
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed
                            && input.virtual_keycode == Some(VirtualKeyCode::O)
                        {
                            if let Some(path) = pick_image_file() {
                                ui_state.is_loading = true;
                                start_load_reference(path, ref_tx.clone());
                            }
                        }
                    }

                    WindowEvent::DroppedFile(path) => {
                        ui_state.is_loading = true;
                        start_load_reference(path, ref_tx.clone());
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(
                        ctx,
                        &mut app,
                        &mut previews,
                        &mut ui_state,
                        &ref_tx,
                        &gen_tx,
                        &window,
                        &mut current_lang,
                    );
                });

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::error!("render error: {e:?}"),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }
    });
}

#[allow(clippy::too_many_arguments)]
fn draw_ui(
    ctx: &egui::Context,
    app: &mut AppState,
    previews: &mut Previews,
    ui_state: &mut UiState,
    ref_tx: &Sender<LoadedReference>,
    gen_tx: &Sender<(u64, Result<EncodedImage, GenerationError>)>,
    window: &winit::window::Window,
    current_lang: &mut String,
) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(&i18n::tr("menu.file"), |ui| {
                if ui.button(&i18n::tr("menu.open_image")).clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_image_file() {
                        ui_state.is_loading = true;
                        start_load_reference(path, ref_tx.clone());
                    }
                }
                if ui.button(&i18n::tr("menu.exit")).clicked() {
                    std::process::exit(0);
                }
            });

            ui.menu_button(&i18n::tr("menu.view"), |ui| {
                if ui.button(&i18n::tr("view.reset")).clicked() {
                    app.apply(AppEvent::Reset);
                    ui.close_menu();
                }
                if ui.button(&i18n::tr("view.clear_result")).clicked() {
                    app.apply(AppEvent::ResultCleared);
                    previews.result = None;
                    ui.close_menu();
                }
                ui.separator();
                if ui.button(&i18n::tr("view.reload")).clicked() {
                    // 重载：重读配置、丢弃整个会话（也是唯一的在途请求恢复手段）
                    *app = AppState::new(config::load().into_config());
                    *previews = Previews::default();
                    ui_state.config_draft = app.config.clone();
                    ui.close_menu();
                }
            });

            ui.menu_button(&i18n::tr("menu.config"), |ui| {
                if ui.button(&i18n::tr("config.open")).clicked() {
                    ui_state.config_draft = app.config.clone();
                    ui_state.show_config = true;
                    ui.close_menu();
                }
            });

            ui.menu_button(&i18n::tr("menu.language"), |ui| {
                let langs: [(&str, &str); 2] = [("zh-Hans", "简体中文"), ("en", "English")];
                for (code, name) in langs {
                    if ui.radio_value(current_lang, code.to_string(), name).clicked() {
                        i18n::init(current_lang.clone());
                        window.set_title(&i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui_state.is_loading || app.generating {
                ui.label(
                    egui::RichText::new(i18n::tr("status.generating"))
                        .color(egui::Color32::YELLOW),
                );
                ui.label("|");
            }
            let s = &app.settings;
            ui.label(format!("{}: {:.0}°", i18n::tr("label.view"), s.view));
            ui.label("|");
            ui.label(format!("{}: {:.0}°", i18n::tr("label.angle"), s.angle));
            ui.label("|");
            ui.label(format!("{}: {:.0}", i18n::tr("label.shot"), s.shot));
            ui.label("|");
            ui.label(camera::view_category(s.view).label());
            ui.label(camera::angle_category(s.angle).label());
            ui.label(camera::shot_category(s.shot).label());
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        ui.columns(3, |cols| {
            draw_reference_panel(&mut cols[0], app, previews, ui_state, ref_tx);
            draw_controller_panel(&mut cols[1], app, ui_state, gen_tx);
            draw_result_panel(&mut cols[2], app, previews);
        });
    });

    draw_config_window(ctx, app, ui_state);
}

fn draw_reference_panel(
    ui: &mut egui::Ui,
    app: &mut AppState,
    previews: &mut Previews,
    ui_state: &mut UiState,
    ref_tx: &Sender<LoadedReference>,
) {
    ui.heading(&i18n::tr("panel.reference"));
    ui.separator();

    if let Some(tex) = &previews.reference {
        let w = ui.available_width();
        ui.add(egui::Image::new(tex).max_size(egui::vec2(w, w * 16.0 / 9.0)));
        if ui.button(&i18n::tr("reference.clear")).clicked() {
            app.apply(AppEvent::ReferenceCleared);
            previews.reference = None;
        }
    } else {
        ui.label(&i18n::tr("upload.hint"));
        ui.label(
            egui::RichText::new(i18n::tr("upload.formats"))
                .small()
                .weak(),
        );
        ui.add_space(8.0);
        if ui.button(&i18n::tr("upload.button")).clicked() {
            if let Some(path) = pick_image_file() {
                ui_state.is_loading = true;
                start_load_reference(path, ref_tx.clone());
            }
        }
    }
}

fn draw_controller_panel(
    ui: &mut egui::Ui,
    app: &mut AppState,
    ui_state: &mut UiState,
    gen_tx: &Sender<(u64, Result<EncodedImage, GenerationError>)>,
) {
    ui.heading(&i18n::tr("panel.controller"));
    ui.label(egui::RichText::new(i18n::tr("sphere.hint")).small().weak());
    ui.separator();

    ui.vertical_centered(|ui| {
        if let Some(delta) = ui_state.sphere.show(ui, &app.settings) {
            app.apply(AppEvent::DragDelta {
                dx: delta.x,
                dy: delta.y,
            });
        }
    });

    // 滑杆走和球面相同的事件路径
    let s = app.settings;

    let mut view = s.view;
    ui.add(
        egui::Slider::new(&mut view, 0.0..=360.0)
            .integer()
            .text(i18n::tr("slider.view")),
    );
    if view != s.view {
        app.apply(AppEvent::ViewSet(view));
    }

    let mut angle = s.angle;
    ui.add(
        egui::Slider::new(&mut angle, -90.0..=90.0)
            .integer()
            .text(i18n::tr("slider.angle")),
    );
    if angle != s.angle {
        app.apply(AppEvent::AngleSet(angle));
    }

    let mut shot = s.shot;
    ui.add(
        egui::Slider::new(&mut shot, 0.0..=100.0)
            .integer()
            .text(i18n::tr("slider.shot")),
    );
    if shot != s.shot {
        app.apply(AppEvent::ShotSet(shot));
    }

    ui.add_space(8.0);
    ui.columns(3, |cols| {
        label_readout(&mut cols[0], "label.view", camera::view_category(s.view).label());
        label_readout(&mut cols[1], "label.angle", camera::angle_category(s.angle).label());
        label_readout(&mut cols[2], "label.shot", camera::shot_category(s.shot).label());
    });

    ui.add_space(12.0);
    let text = if app.generating {
        i18n::tr("generate.busy")
    } else {
        i18n::tr("generate.button")
    };
    let button = egui::Button::new(egui::RichText::new(text).strong())
        .min_size(egui::vec2(ui.available_width(), 40.0));
    if ui.add_enabled(app.can_generate(), button).clicked() {
        if let Some(reference) = app.reference.clone() {
            if app.begin_generation() {
                let id =
                    api::spawn_generation(app.config.clone(), app.settings, reference, gen_tx.clone());
                app.track_request(id);
            }
        }
    }

    if !app.config.has_key() {
        ui.label(
            egui::RichText::new(i18n::tr("config.need_key"))
                .small()
                .color(egui::Color32::LIGHT_RED),
        );
    }
}

fn label_readout(ui: &mut egui::Ui, key: &str, value: &str) {
    ui.vertical_centered(|ui| {
        ui.label(egui::RichText::new(i18n::tr(key)).small().weak());
        ui.label(egui::RichText::new(value).strong());
    });
}

fn draw_result_panel(ui: &mut egui::Ui, app: &mut AppState, previews: &mut Previews) {
    ui.heading(&i18n::tr("panel.result"));
    ui.separator();

    if let Some(tex) = &previews.result {
        let w = ui.available_width();
        ui.add(egui::Image::new(tex).max_size(egui::vec2(w, w * 16.0 / 9.0)));
    }

    match &app.result {
        Some(result) => {
            if ui.button(&i18n::tr("result.download")).clicked() {
                save_result(result);
            }
        }
        None => {
            ui.label(egui::RichText::new(i18n::tr("result.placeholder")).weak());
            let hint = if app.generating {
                i18n::tr("result.hint.busy")
            } else {
                i18n::tr("result.hint.idle")
            };
            ui.label(egui::RichText::new(hint).small().weak());
        }
    }
}

fn draw_config_window(ctx: &egui::Context, app: &mut AppState, ui_state: &mut UiState) {
    let UiState {
        show_config,
        config_draft,
        ..
    } = ui_state;

    let mut save_clicked = false;
    egui::Window::new(i18n::tr("config.title"))
        .open(show_config)
        .collapsible(false)
        .resizable(false)
        .show(ctx, |ui| {
            ui.label(&i18n::tr("config.base_url"));
            ui.text_edit_singleline(&mut config_draft.base_url);

            ui.label(&i18n::tr("config.api_key"));
            ui.add(egui::TextEdit::singleline(&mut config_draft.api_key).password(true));

            ui.label(&i18n::tr("config.model"));
            ui.text_edit_singleline(&mut config_draft.model);

            ui.add_space(8.0);
            if ui.button(&i18n::tr("config.save")).clicked() {
                save_clicked = true;
            }
        });

    if save_clicked {
        match config::save(config_draft) {
            Ok(path) => {
                log::info!("config saved to {}", path.display());
                app.apply(AppEvent::ConfigSaved(config_draft.clone()));
                *show_config = false;
            }
            Err(e) => {
                alert(
                    &i18n::tr("config.title"),
                    &i18n::tr_with("error.save_config", &[("err", e.to_string())]),
                );
            }
        }
    }
}

// --- 文件与图片 ---

fn pick_image_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(
            &i18n::tr("file.filter.images"),
            &["jpg", "jpeg", "png", "webp", "bmp"],
        )
        .pick_file()
}

/// 后台读取并解码参考图；载荷保留原始字节，预览限制到 2048 边长。
/// 失败同样发回消息，UI 才能解除加载中状态。
fn start_load_reference(path: PathBuf, tx: Sender<LoadedReference>) {
    thread::spawn(move || {
        log::info!("loading reference image: {}", path.display());
        if tx.send(load_reference(&path)).is_err() {
            log::warn!("reference image dropped: ui channel closed");
        }
    });
}

fn load_reference(path: &Path) -> LoadedReference {
    let bytes =
        std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let img = image::load_from_memory(&bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    let mime = sniff_mime(&bytes);
    let preview = to_color_image(&img.thumbnail(2048, 2048));
    Ok((EncodedImage { bytes, mime }, preview))
}

fn decode_preview(img: &EncodedImage) -> Option<egui::ColorImage> {
    match image::load_from_memory(&img.bytes) {
        Ok(decoded) => Some(to_color_image(&decoded.thumbnail(2048, 2048))),
        Err(e) => {
            log::warn!("result image not displayable: {e}");
            None
        }
    }
}

fn to_color_image(img: &image::DynamicImage) -> egui::ColorImage {
    let rgba = img.to_rgba8();
    let (w, h) = rgba.dimensions();
    egui::ColorImage::from_rgba_unmultiplied([w as usize, h as usize], rgba.as_raw())
}

fn sniff_mime(bytes: &[u8]) -> String {
    let mime = match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => "image/png",
        Ok(image::ImageFormat::Jpeg) => "image/jpeg",
        Ok(image::ImageFormat::WebP) => "image/webp",
        Ok(image::ImageFormat::Bmp) => "image/bmp",
        Ok(image::ImageFormat::Gif) => "image/gif",
        _ => "image/png",
    };
    mime.to_string()
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/bmp" => "bmp",
        "image/gif" => "gif",
        _ => "png",
    }
}

fn save_result(result: &EncodedImage) {
    let ext = extension_for_mime(&result.mime);
    let Some(path) = rfd::FileDialog::new()
        .set_file_name(&format!("3d-perspective-output.{ext}"))
        .save_file()
    else {
        return;
    };
    if let Err(e) = std::fs::write(&path, &result.bytes) {
        alert(
            &i18n::tr("panel.result"),
            &i18n::tr_with("error.save_result", &[("err", e.to_string())]),
        );
    } else {
        log::info!("result saved to {}", path.display());
    }
}

fn alert(title: &str, message: &str) {
    let _ = rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title(title)
        .set_description(message)
        .show();
}
