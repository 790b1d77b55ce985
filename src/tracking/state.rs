//! 跟踪状态机 (Tracking state machine)
//!
//! Idle ⇄ Tracking. 只由跟踪循环线程持有和修改.

use super::types::NormalizedRect;

/// 状态机阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// 没有跟踪目标
    Idle,
    /// 有跟踪目标, 每帧自动更新
    Tracking,
}

/// 帧被丢弃的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// 没有跟踪目标
    NoTarget,
    /// 已有一次跟踪调用未完成
    Busy,
}

/// 帧分发决定
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Dispatch {
    Drop(DropReason),
    Submit {
        target: NormalizedRect,
        generation: u64,
    },
}

/// 完成回调的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CompletionEffect {
    /// 跟踪区域被替换为新结果
    Updated(NormalizedRect),
    /// 无结果或失败, 跟踪区域不变
    Unchanged,
    /// 代数不匹配 (已点击重锁或清除), 结果丢弃
    Stale,
}

/// 跟踪状态: 当前跟踪区域 + 代数令牌 + 在途标志
#[derive(Debug, Clone, Default)]
pub struct TrackingState {
    target: Option<NormalizedRect>,
    generation: u64,
    in_flight: bool,
}

impl TrackingState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        if self.target.is_some() {
            Phase::Tracking
        } else {
            Phase::Idle
        }
    }

    pub fn target(&self) -> Option<NormalizedRect> {
        self.target
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// 新帧到达: 决定是否提交给跟踪器
    pub fn dispatch(&mut self) -> Dispatch {
        let Some(target) = self.target else {
            return Dispatch::Drop(DropReason::NoTarget);
        };
        if self.in_flight {
            return Dispatch::Drop(DropReason::Busy);
        }
        self.in_flight = true;
        Dispatch::Submit {
            target,
            generation: self.generation,
        }
    }

    /// 点击锁定新目标 (Idle → Tracking, 或 Tracking 下重锁)
    pub fn set_target(&mut self, target: NormalizedRect) {
        self.target = Some(target);
        self.generation += 1;
    }

    /// 长按清除 (Tracking → Idle)
    pub fn clear(&mut self) {
        self.target = None;
        self.generation += 1;
    }

    /// 跟踪调用完成. 在途标志总是释放; 结果只在代数匹配时生效.
    pub fn complete(&mut self, generation: u64, result: Option<NormalizedRect>) -> CompletionEffect {
        self.in_flight = false;
        if generation != self.generation || self.target.is_none() {
            return CompletionEffect::Stale;
        }
        match result {
            Some(rect) => {
                self.target = Some(rect);
                CompletionEffect::Updated(rect)
            }
            None => CompletionEffect::Unchanged,
        }
    }

    /// 采集会话重启: 回到 Idle. 在途调用的结果将被丢弃, 但在途标志保留到它完成为止.
    pub fn reset(&mut self) {
        self.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f32) -> NormalizedRect {
        NormalizedRect::new(x, 0.5, 0.1, 0.1)
    }

    #[test]
    fn test_idle_drops_frames() {
        let mut state = TrackingState::new();
        for _ in 0..5 {
            assert_eq!(state.dispatch(), Dispatch::Drop(DropReason::NoTarget));
        }
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!state.in_flight());
    }

    #[test]
    fn test_tap_starts_tracking() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        assert_eq!(state.phase(), Phase::Tracking);
        assert_eq!(
            state.dispatch(),
            Dispatch::Submit {
                target: rect(0.2),
                generation: 1
            }
        );
    }

    #[test]
    fn test_single_in_flight() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        assert!(matches!(state.dispatch(), Dispatch::Submit { .. }));
        assert_eq!(state.dispatch(), Dispatch::Drop(DropReason::Busy));
        assert_eq!(state.dispatch(), Dispatch::Drop(DropReason::Busy));

        state.complete(1, None);
        assert!(matches!(state.dispatch(), Dispatch::Submit { .. }));
    }

    #[test]
    fn test_success_replaces_target_exactly() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        let Dispatch::Submit { generation, .. } = state.dispatch() else {
            panic!("expected submit");
        };
        let next = NormalizedRect::new(0.31, 0.47, 0.12, 0.09);
        assert_eq!(state.complete(generation, Some(next)), CompletionEffect::Updated(next));
        assert_eq!(state.target(), Some(next));
    }

    #[test]
    fn test_empty_result_keeps_target() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        state.dispatch();
        assert_eq!(state.complete(1, None), CompletionEffect::Unchanged);
        assert_eq!(state.target(), Some(rect(0.2)));
    }

    #[test]
    fn test_clear_wins_over_late_completion() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        let Dispatch::Submit { generation, .. } = state.dispatch() else {
            panic!("expected submit");
        };
        state.clear();
        assert_eq!(state.complete(generation, Some(rect(0.4))), CompletionEffect::Stale);
        assert_eq!(state.target(), None);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(!state.in_flight());
    }

    #[test]
    fn test_retap_discards_old_generation() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        let Dispatch::Submit { generation, .. } = state.dispatch() else {
            panic!("expected submit");
        };
        state.set_target(rect(0.6));
        assert_eq!(state.complete(generation, Some(rect(0.3))), CompletionEffect::Stale);
        assert_eq!(state.target(), Some(rect(0.6)));
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let mut state = TrackingState::new();
        state.set_target(rect(0.2));
        state.reset();
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.dispatch(), Dispatch::Drop(DropReason::NoTarget));
    }
}
