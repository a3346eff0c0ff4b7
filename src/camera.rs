// camera.rs — 相机参数、分类与球面投影

use glam::Vec2;

/// 拖拽灵敏度：每像素 0.8 度
pub const DRAG_SENSITIVITY: f32 = 0.8;

pub const DEFAULT_VIEW: f32 = 45.0;
pub const DEFAULT_ANGLE: f32 = 20.0;
pub const DEFAULT_SHOT: f32 = 80.0;

/// 当前相机参数。
/// view 始终规范化到 [0,360)，angle 夹取到 [-90,90]，shot 夹取到 [0,100]。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub view: f32,
    pub angle: f32,
    pub shot: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            view: DEFAULT_VIEW,
            angle: DEFAULT_ANGLE,
            shot: DEFAULT_SHOT,
        }
    }
}

impl CameraSettings {
    /// 应用一次拖拽增量：横向改 view（回绕），纵向改 angle（夹取，屏幕 Y 向下所以取反）。
    pub fn apply_drag(&mut self, dx: f32, dy: f32) {
        self.view = wrap_view(self.view + dx * DRAG_SENSITIVITY);
        self.angle = (self.angle - dy * DRAG_SENSITIVITY).clamp(-90.0, 90.0);
    }

    pub fn set_view(&mut self, view: f32) {
        self.view = wrap_view(view);
    }

    pub fn set_angle(&mut self, angle: f32) {
        self.angle = angle.clamp(-90.0, 90.0);
    }

    pub fn set_shot(&mut self, shot: f32) {
        self.shot = shot.clamp(0.0, 100.0);
    }
}

/// 规范化到 [0,360)，负数加 360。
pub fn wrap_view(deg: f32) -> f32 {
    let mut v = deg % 360.0;
    if v < 0.0 {
        v += 360.0;
    }
    v
}

/// 一次拖拽手势的瞬态状态：只保存上一次指针位置。
/// 手势开始时创建，每次移动更新，手势结束（含失焦、指针消失）即丢弃。
#[derive(Debug, Clone, Copy)]
pub struct DragSession {
    last: Vec2,
}

impl DragSession {
    pub fn begin(pos: Vec2) -> Self {
        Self { last: pos }
    }

    /// 相对上一次指针位置的增量，并记住当前位置。
    pub fn update(&mut self, pos: Vec2) -> Vec2 {
        let delta = pos - self.last;
        self.last = pos;
        delta
    }
}

// ----------------------------------------------------------------------------
// 分类：数值 → 可读标签。标签原样进入生成提示词，边界语义不可改动。
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewCategory {
    Front,
    ThreeQuarter,
    Side,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AngleCategory {
    LowAngle,
    EyeLevel,
    HighAngle,
    Overhead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotCategory {
    CloseUp,
    Medium,
    FullBody,
    LongShot,
}

/// 注意边界的不对称：正好 315 属于 Back 而不是 Front。
pub fn view_category(deg: f32) -> ViewCategory {
    if deg < 45.0 || deg > 315.0 {
        ViewCategory::Front
    } else if deg < 135.0 {
        ViewCategory::ThreeQuarter
    } else if deg < 225.0 {
        ViewCategory::Side
    } else {
        ViewCategory::Back
    }
}

pub fn angle_category(deg: f32) -> AngleCategory {
    if deg < -30.0 {
        AngleCategory::LowAngle
    } else if deg < 30.0 {
        AngleCategory::EyeLevel
    } else if deg < 70.0 {
        AngleCategory::HighAngle
    } else {
        AngleCategory::Overhead
    }
}

pub fn shot_category(val: f32) -> ShotCategory {
    if val < 25.0 {
        ShotCategory::CloseUp
    } else if val < 50.0 {
        ShotCategory::Medium
    } else if val < 75.0 {
        ShotCategory::FullBody
    } else {
        ShotCategory::LongShot
    }
}

impl ViewCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Front => "Front (正)",
            Self::ThreeQuarter => "3/4 View (3/4侧面)",
            Self::Side => "Side (侧面)",
            Self::Back => "Back (背)",
        }
    }
}

impl AngleCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::LowAngle => "Low Angle (仰视)",
            Self::EyeLevel => "Eye Level (平视)",
            Self::HighAngle => "High Angle (俯视)",
            Self::Overhead => "Overhead (顶视)",
        }
    }
}

impl ShotCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::CloseUp => "Close-up (特写)",
            Self::Medium => "Medium (中景)",
            Self::FullBody => "Full Body (全身)",
            Self::LongShot => "Long Shot (远景)",
        }
    }
}

// ----------------------------------------------------------------------------
// 球面投影：把 (view, angle) 投到固定半径圆面上的标记位置。
// 只用于摆放相机图标，是刻意简化的视觉示意，不是真实透视模型。
// ----------------------------------------------------------------------------

pub fn project_marker(view_deg: f32, angle_deg: f32, center: Vec2, radius: f32) -> Vec2 {
    let rad_h = view_deg.to_radians();
    let rad_v = angle_deg.to_radians();
    Vec2::new(
        center.x + radius * rad_v.cos() * rad_h.sin(),
        center.y - radius * rad_v.sin(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_band_boundaries() {
        assert_eq!(view_category(0.0), ViewCategory::Front);
        assert_eq!(view_category(44.9), ViewCategory::Front);
        assert_eq!(view_category(45.0), ViewCategory::ThreeQuarter);
        assert_eq!(view_category(134.9), ViewCategory::ThreeQuarter);
        assert_eq!(view_category(135.0), ViewCategory::Side);
        assert_eq!(view_category(225.0), ViewCategory::Back);
        // 315 正好落在 Back，不是 Front
        assert_eq!(view_category(315.0), ViewCategory::Back);
        assert_eq!(view_category(315.1), ViewCategory::Front);
        assert_eq!(view_category(359.9), ViewCategory::Front);
    }

    #[test]
    fn angle_band_boundaries() {
        assert_eq!(angle_category(-90.0), AngleCategory::LowAngle);
        assert_eq!(angle_category(-30.1), AngleCategory::LowAngle);
        // 条件是严格小于，-30 已经是 EyeLevel
        assert_eq!(angle_category(-30.0), AngleCategory::EyeLevel);
        assert_eq!(angle_category(29.9), AngleCategory::EyeLevel);
        assert_eq!(angle_category(30.0), AngleCategory::HighAngle);
        assert_eq!(angle_category(69.9), AngleCategory::HighAngle);
        assert_eq!(angle_category(70.0), AngleCategory::Overhead);
        assert_eq!(angle_category(90.0), AngleCategory::Overhead);
    }

    #[test]
    fn shot_band_boundaries() {
        assert_eq!(shot_category(0.0), ShotCategory::CloseUp);
        assert_eq!(shot_category(24.99), ShotCategory::CloseUp);
        assert_eq!(shot_category(25.0), ShotCategory::Medium);
        assert_eq!(shot_category(49.9), ShotCategory::Medium);
        assert_eq!(shot_category(50.0), ShotCategory::FullBody);
        assert_eq!(shot_category(74.9), ShotCategory::FullBody);
        assert_eq!(shot_category(75.0), ShotCategory::LongShot);
        assert_eq!(shot_category(100.0), ShotCategory::LongShot);
    }

    #[test]
    fn every_view_has_exactly_one_band() {
        let mut deg = 0.0f32;
        while deg < 360.0 {
            // 全域覆盖：分类函数对任何合法输入都有唯一结果
            let _ = view_category(deg).label();
            deg += 0.5;
        }
    }

    #[test]
    fn drag_accumulates_linearly() {
        let mut a = CameraSettings::default();
        a.apply_drag(12.5, 0.0);
        a.apply_drag(7.5, 0.0);

        let mut b = CameraSettings::default();
        b.apply_drag(20.0, 0.0);

        assert!((a.view - b.view).abs() < 1e-4);
    }

    #[test]
    fn drag_wraps_view() {
        let mut s = CameraSettings {
            view: 355.0,
            angle: 0.0,
            shot: 50.0,
        };
        // 355 + 10*0.8 = 363 → 回绕到 3
        s.apply_drag(10.0, 0.0);
        assert!((s.view - 3.0).abs() < 1e-4);

        let mut s = CameraSettings {
            view: 5.0,
            angle: 0.0,
            shot: 50.0,
        };
        s.apply_drag(-10.0, 0.0);
        assert!((s.view - 357.0).abs() < 1e-4);
        assert!(s.view >= 0.0 && s.view < 360.0);
    }

    #[test]
    fn drag_clamps_angle() {
        let mut s = CameraSettings {
            view: 0.0,
            angle: 85.0,
            shot: 50.0,
        };
        // 85 - (-20)*0.8 = 101 → 夹到 90
        s.apply_drag(0.0, -20.0);
        assert_eq!(s.angle, 90.0);

        s.angle = -85.0;
        s.apply_drag(0.0, 20.0);
        assert_eq!(s.angle, -90.0);
    }

    #[test]
    fn drag_session_tracks_last_position() {
        let mut session = DragSession::begin(Vec2::new(100.0, 100.0));

        let d1 = session.update(Vec2::new(110.0, 100.0));
        assert_eq!(d1, Vec2::new(10.0, 0.0));

        // 增量相对上一次位置，而不是起点
        let d2 = session.update(Vec2::new(110.0, 90.0));
        assert_eq!(d2, Vec2::new(0.0, -10.0));
    }

    #[test]
    fn projection_is_deterministic() {
        let c = Vec2::new(100.0, 100.0);
        let p1 = project_marker(45.0, 20.0, c, 80.0);
        let p2 = project_marker(45.0, 20.0, c, 80.0);
        assert_eq!(p1, p2);
    }

    #[test]
    fn projection_known_points() {
        let c = Vec2::new(100.0, 100.0);

        // view=0：sin(0)=0，标记在竖直中线上
        let p = project_marker(0.0, 0.0, c, 80.0);
        assert!((p.x - 100.0).abs() < 1e-3);
        assert!((p.y - 100.0).abs() < 1e-3);

        // view=90, angle=0：标记在右侧边缘
        let p = project_marker(90.0, 0.0, c, 80.0);
        assert!((p.x - 180.0).abs() < 1e-3);

        // angle=90：标记在顶端（屏幕 Y 向下，所以是 center.y - r）
        let p = project_marker(0.0, 90.0, c, 80.0);
        assert!((p.y - 20.0).abs() < 1e-3);
    }

    #[test]
    fn wrap_view_normalizes_negatives() {
        assert!((wrap_view(-1.0) - 359.0).abs() < 1e-4);
        assert!((wrap_view(361.0) - 1.0).abs() < 1e-4);
        assert_eq!(wrap_view(0.0), 0.0);
    }

    #[test]
    fn set_view_keeps_half_open_range() {
        let mut s = CameraSettings::default();
        // 滑块端点 360 回绕到 0，视角始终落在 [0, 360)
        s.set_view(360.0);
        assert_eq!(s.view, 0.0);

        s.set_view(200.0);
        assert_eq!(s.view, 200.0);

        s.set_view(-10.0);
        assert!((s.view - 350.0).abs() < 1e-4);
        assert!(s.view >= 0.0 && s.view < 360.0);
    }
}
