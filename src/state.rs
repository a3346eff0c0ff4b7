// state.rs — 会话状态容器（reducer 风格）
//
// 所有 UI 处理器都通过 Event + apply 改状态，每种迁移都可以单独测试。
// 状态只在 UI 线程上被修改，工作线程的结果经 channel 回流后同样走 apply。

use crate::camera::CameraSettings;
use crate::config::ApiConfig;

/// 编码后的图片载荷（原始字节 + MIME），不在核心里解码。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

#[derive(Debug, Clone)]
pub enum Event {
    ReferenceLoaded(EncodedImage),
    ReferenceCleared,
    DragDelta { dx: f32, dy: f32 },
    ViewSet(f32),
    AngleSet(f32),
    ShotSet(f32),
    ResultCleared,
    ConfigSaved(ApiConfig),
    GenerationStarted,
    GenerationSucceeded(EncodedImage),
    GenerationFailed,
    Reset,
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub settings: CameraSettings,
    pub reference: Option<EncodedImage>,
    pub result: Option<EncodedImage>,
    pub generating: bool,
    /// 当前在途请求的编号，结果回流时据此丢弃过期响应。
    pub active_request: Option<u64>,
    pub config: ApiConfig,
}

impl AppState {
    pub fn new(config: ApiConfig) -> Self {
        Self {
            settings: CameraSettings::default(),
            reference: None,
            result: None,
            generating: false,
            active_request: None,
            config,
        }
    }

    /// 生成按钮可用的条件：有参考图、配好 key、且没有在途请求。
    pub fn can_generate(&self) -> bool {
        self.reference.is_some() && self.config.has_key() && !self.generating
    }

    /// 尝试进入生成状态。保证同一会话最多一个在途请求：
    /// 条件不满足时拒绝并返回 false，状态不变。
    pub fn begin_generation(&mut self) -> bool {
        if !self.can_generate() {
            return false;
        }
        self.apply(Event::GenerationStarted);
        true
    }

    /// 记录刚派发的请求编号。
    pub fn track_request(&mut self, id: u64) {
        self.active_request = Some(id);
    }

    /// 只有编号与在途请求一致的结果才被接收。重载会话后 active_request
    /// 归零，而请求编号全局递增，旧会话的迟到结果永远对不上号。
    pub fn accepts_result(&self, id: u64) -> bool {
        self.generating && self.active_request == Some(id)
    }

    pub fn apply(&mut self, event: Event) {
        match event {
            Event::ReferenceLoaded(img) => {
                self.reference = Some(img);
            }
            Event::ReferenceCleared => {
                self.reference = None;
            }
            Event::DragDelta { dx, dy } => {
                self.settings.apply_drag(dx, dy);
            }
            Event::ViewSet(v) => self.settings.set_view(v),
            Event::AngleSet(v) => self.settings.set_angle(v),
            Event::ShotSet(v) => self.settings.set_shot(v),
            Event::ResultCleared => {
                self.result = None;
            }
            Event::ConfigSaved(config) => {
                self.config = config;
            }
            Event::GenerationStarted => {
                self.generating = true;
            }
            Event::GenerationSucceeded(img) => {
                // 结果整体替换，从不合并
                self.result = Some(img);
                self.generating = false;
                self.active_request = None;
            }
            Event::GenerationFailed => {
                // 失败不动已有结果，只清掉在途标记
                self.generating = false;
                self.active_request = None;
            }
            Event::Reset => {
                self.settings = CameraSettings::default();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{DEFAULT_ANGLE, DEFAULT_SHOT, DEFAULT_VIEW};

    fn png_stub() -> EncodedImage {
        EncodedImage {
            bytes: vec![0x89, 0x50, 0x4e, 0x47],
            mime: "image/png".into(),
        }
    }

    fn configured() -> ApiConfig {
        ApiConfig {
            api_key: "test-key".into(),
            ..ApiConfig::default()
        }
    }

    #[test]
    fn generation_requires_reference_and_key() {
        let mut s = AppState::new(ApiConfig::default());
        assert!(!s.begin_generation());

        s.apply(Event::ReferenceLoaded(png_stub()));
        // 还没配 key
        assert!(!s.begin_generation());

        s.apply(Event::ConfigSaved(configured()));
        assert!(s.begin_generation());
        assert!(s.generating);
    }

    #[test]
    fn at_most_one_generation_in_flight() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));

        assert!(s.begin_generation());
        // 第二次触发必须被拒绝
        assert!(!s.begin_generation());
        assert!(s.generating);

        s.apply(Event::GenerationFailed);
        assert!(s.begin_generation());
    }

    #[test]
    fn success_replaces_result_wholesale() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        s.begin_generation();

        let first = EncodedImage {
            bytes: vec![1, 2, 3],
            mime: "image/png".into(),
        };
        s.apply(Event::GenerationSucceeded(first.clone()));
        assert_eq!(s.result.as_ref(), Some(&first));
        assert!(!s.generating);

        s.begin_generation();
        let second = EncodedImage {
            bytes: vec![9],
            mime: "image/jpeg".into(),
        };
        s.apply(Event::GenerationSucceeded(second.clone()));
        assert_eq!(s.result, Some(second));
    }

    #[test]
    fn failure_leaves_result_untouched() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        s.begin_generation();
        s.apply(Event::GenerationSucceeded(png_stub()));

        s.begin_generation();
        s.apply(Event::GenerationFailed);
        assert_eq!(s.result, Some(png_stub()));
        assert!(!s.generating);
    }

    #[test]
    fn drag_and_sliders_update_settings() {
        let mut s = AppState::new(ApiConfig::default());
        s.apply(Event::DragDelta { dx: 10.0, dy: 0.0 });
        assert!((s.settings.view - (DEFAULT_VIEW + 8.0)).abs() < 1e-4);

        s.apply(Event::ViewSet(200.0));
        s.apply(Event::AngleSet(-45.0));
        s.apply(Event::ShotSet(10.0));
        assert_eq!(s.settings.view, 200.0);
        assert_eq!(s.settings.angle, -45.0);
        assert_eq!(s.settings.shot, 10.0);

        // slider 路径也有夹取
        s.apply(Event::AngleSet(400.0));
        assert_eq!(s.settings.angle, 90.0);
    }

    #[test]
    fn reset_restores_default_settings_only() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        s.apply(Event::ViewSet(300.0));
        s.apply(Event::ShotSet(5.0));

        s.apply(Event::Reset);
        assert_eq!(s.settings.view, DEFAULT_VIEW);
        assert_eq!(s.settings.angle, DEFAULT_ANGLE);
        assert_eq!(s.settings.shot, DEFAULT_SHOT);
        // 参考图与配置不受重置影响
        assert!(s.reference.is_some());
        assert!(s.config.has_key());
    }

    #[test]
    fn clear_result_only_drops_result() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        s.begin_generation();
        s.apply(Event::GenerationSucceeded(png_stub()));

        s.apply(Event::ResultCleared);
        assert!(s.result.is_none());
        assert!(s.reference.is_some());
    }

    #[test]
    fn stale_result_from_previous_session_is_rejected() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        assert!(s.begin_generation());
        s.track_request(1);
        assert!(s.accepts_result(1));

        // 会话重载，请求 1 仍在途
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        assert!(!s.accepts_result(1));

        // 新会话里发起请求 2 之后，迟到的 1 号结果仍然对不上号
        assert!(s.begin_generation());
        s.track_request(2);
        assert!(!s.accepts_result(1));
        assert!(s.accepts_result(2));

        s.apply(Event::GenerationSucceeded(png_stub()));
        // 已完成的请求不再接收任何结果
        assert!(!s.accepts_result(2));
    }

    #[test]
    fn clear_reference_disables_generation() {
        let mut s = AppState::new(configured());
        s.apply(Event::ReferenceLoaded(png_stub()));
        assert!(s.can_generate());
        s.apply(Event::ReferenceCleared);
        assert!(!s.can_generate());
    }
}
