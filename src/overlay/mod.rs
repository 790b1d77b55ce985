/// 叠加层系统 (Overlay System)
///
/// 跟踪循环和条码循环在后台线程产生叠加层更新, 通过UI队列
/// 投递到UI线程, 由UI线程统一应用到叠加层.
pub mod canvas;

pub use canvas::{load_font, ImageOverlay};

use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::tracking::LayerRect;

/// 叠加层: 锁定框 + 文本标签
pub trait Overlay {
    /// 设置锁定框 (图层坐标). `LayerRect::ZERO` 表示清空.
    fn set_lock_on(&mut self, rect: LayerRect);

    fn set_label(&mut self, text: String);

    fn set_label_hidden(&mut self, hidden: bool);
}

/// 叠加层更新消息 (后台线程 → UI线程)
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayUpdate {
    LockOn(LayerRect),
    ResetLockOn,
    ShowLabel(String),
    HideLabel,
}

impl OverlayUpdate {
    pub fn apply(self, overlay: &mut dyn Overlay) {
        match self {
            OverlayUpdate::LockOn(rect) => overlay.set_lock_on(rect),
            OverlayUpdate::ResetLockOn => overlay.set_lock_on(LayerRect::ZERO),
            OverlayUpdate::ShowLabel(text) => {
                overlay.set_label(text);
                overlay.set_label_hidden(false);
            }
            OverlayUpdate::HideLabel => overlay.set_label_hidden(true),
        }
    }
}

/// 创建UI队列
pub fn ui_queue() -> (UiSender, UiReceiver) {
    let (tx, rx) = crossbeam_channel::unbounded();
    (UiSender { tx }, UiReceiver { rx })
}

/// UI队列发送端 (任意线程)
#[derive(Clone, Debug)]
pub struct UiSender {
    tx: Sender<OverlayUpdate>,
}

impl UiSender {
    /// UI线程已退出时静默丢弃
    pub fn post(&self, update: OverlayUpdate) {
        let _ = self.tx.send(update);
    }
}

/// UI队列接收端 (只在UI线程使用)
pub struct UiReceiver {
    rx: Receiver<OverlayUpdate>,
}

impl UiReceiver {
    /// 应用所有待处理更新, 返回应用数量
    pub fn drain(&self, overlay: &mut dyn Overlay) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            update.apply(overlay);
            applied += 1;
        }
        applied
    }

    /// 等待下一条更新并应用; 超时返回 false
    pub fn pump_timeout(&self, overlay: &mut dyn Overlay, timeout: Duration) -> bool {
        match self.rx.recv_timeout(timeout) {
            Ok(update) => {
                update.apply(overlay);
                true
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_updates_applied_in_order() {
        let (tx, rx) = ui_queue();
        let sender = tx.clone();
        std::thread::spawn(move || {
            sender.post(OverlayUpdate::LockOn(LayerRect::new(1.0, 2.0, 3.0, 4.0)));
            sender.post(OverlayUpdate::ShowLabel("4901234567894".to_string()));
        })
        .join()
        .unwrap();
        tx.post(OverlayUpdate::ResetLockOn);

        let mut overlay = ImageOverlay::new();
        assert_eq!(rx.drain(&mut overlay), 3);
        assert_eq!(overlay.lock_on(), LayerRect::ZERO);
        assert_eq!(overlay.label(), Some("4901234567894"));
    }

    #[test]
    fn test_hide_label_keeps_text() {
        let mut overlay = ImageOverlay::new();
        OverlayUpdate::ShowLabel("abc".to_string()).apply(&mut overlay);
        OverlayUpdate::HideLabel.apply(&mut overlay);
        assert_eq!(overlay.label(), None);
        assert_eq!(overlay.label_text(), "abc");
    }
}
