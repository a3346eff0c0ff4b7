// sphere.rs — 球面拖拽控件（egui）
//
// 整个圆形区域响应拖拽，不对标记做命中检测；拖出控件范围后手势继续
// （egui 的拖拽捕获），指针消失或失焦按手势结束处理。

use crate::camera::{project_marker, CameraSettings, DragSession};
use glam::Vec2;

/// 固定布局常量：200×200 的场，半径 80。
pub const FIELD_SIZE: f32 = 200.0;
pub const FIELD_RADIUS: f32 = 80.0;

const GRID: egui::Color32 = egui::Color32::from_rgb(148, 163, 184);
const MARKER: egui::Color32 = egui::Color32::from_rgb(251, 191, 36);

pub struct CameraSphere {
    session: Option<DragSession>,
}

impl CameraSphere {
    pub fn new() -> Self {
        Self { session: None }
    }

    pub fn is_dragging(&self) -> bool {
        self.session.is_some()
    }

    /// 绘制并处理一帧。返回本帧的拖拽增量（像素），没有手势则为 None。
    pub fn show(&mut self, ui: &mut egui::Ui, settings: &CameraSettings) -> Option<Vec2> {
        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(FIELD_SIZE, FIELD_SIZE),
            egui::Sense::drag(),
        );

        let delta = self.track_gesture(&response);
        self.paint(ui, rect, settings);

        if response.hovered() || self.session.is_some() {
            ui.ctx().output_mut(|o| o.cursor_icon = egui::CursorIcon::Grab);
        }

        delta
    }

    fn track_gesture(&mut self, response: &egui::Response) -> Option<Vec2> {
        let pointer = response
            .interact_pointer_pos()
            .map(|p| Vec2::new(p.x, p.y));

        if response.drag_started() {
            self.session = pointer.map(DragSession::begin);
            return None;
        }

        if response.dragged() {
            match (self.session.as_mut(), pointer) {
                (Some(session), Some(pos)) => {
                    let d = session.update(pos);
                    if d != Vec2::ZERO {
                        return Some(d);
                    }
                }
                // 指针没了（失焦等），视为手势结束
                _ => self.session = None,
            }
            return None;
        }

        // 松开或其他任何非拖拽状态都丢弃会话，之后不再产生增量
        self.session = None;
        None
    }

    fn paint(&self, ui: &egui::Ui, rect: egui::Rect, settings: &CameraSettings) {
        let painter = ui.painter_at(rect.expand(12.0));
        let center = rect.center();
        let r = FIELD_RADIUS;

        let thin = egui::Stroke::new(1.0, GRID.gamma_multiply(0.4));

        // 外圈（虚线）
        let outer: Vec<egui::Pos2> = circle_points(center, r, r, 72);
        for shape in egui::Shape::dashed_line(&outer, egui::Stroke::new(0.5, GRID.gamma_multiply(0.3)), 2.0, 4.0) {
            painter.add(shape);
        }

        // 经纬示意：横椭圆 + 竖椭圆 + 两条轴线
        painter.add(egui::Shape::closed_line(circle_points(center, r, r * 0.375, 72), thin));
        painter.add(egui::Shape::closed_line(circle_points(center, r * 0.375, r, 72), thin));
        painter.line_segment(
            [center - egui::vec2(0.0, r), center + egui::vec2(0.0, r)],
            thin,
        );
        painter.line_segment(
            [center - egui::vec2(r, 0.0), center + egui::vec2(r, 0.0)],
            thin,
        );

        // 中心焦点指示器
        let focus = egui::Rect::from_center_size(center, egui::vec2(16.0, 30.0));
        painter.rect(
            focus,
            4.0,
            egui::Color32::from_rgb(241, 245, 249),
            egui::Stroke::new(1.5, GRID),
        );
        painter.text(
            center,
            egui::Align2::CENTER_CENTER,
            "F",
            egui::FontId::proportional(10.0),
            egui::Color32::from_rgb(100, 116, 139),
        );

        // 相机标记
        let pos = project_marker(
            settings.view,
            settings.angle,
            Vec2::new(center.x, center.y),
            r,
        );
        let marker = egui::pos2(pos.x, pos.y);
        let marker_r = if self.is_dragging() { 10.0 } else { 9.0 };

        // 指向中心的方向短线；标记正好落在中心时没有方向可画
        let to_center = center - marker;
        if to_center.length() > 1.0 {
            painter.line_segment(
                [marker, marker + to_center.normalized() * 24.0],
                egui::Stroke::new(2.0, MARKER.gamma_multiply(0.6)),
            );
        }

        painter.circle_filled(marker, marker_r, MARKER);
        painter.circle_stroke(marker, marker_r, egui::Stroke::new(2.0, egui::Color32::WHITE));
    }
}

fn circle_points(center: egui::Pos2, rx: f32, ry: f32, n: usize) -> Vec<egui::Pos2> {
    (0..=n)
        .map(|i| {
            let t = std::f32::consts::TAU * (i as f32) / (n as f32);
            egui::pos2(center.x + rx * t.cos(), center.y + ry * t.sin())
        })
        .collect()
}
