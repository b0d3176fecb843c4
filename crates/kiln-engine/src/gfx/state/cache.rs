use crate::gfx::api::{Capability, GraphicsApi, StateQuery};

use super::render_state::{BlendFactor, BlendFn, DepthFn, RenderState};

/// Tracks pipeline state and emits only the native calls needed to change it.
///
/// Two states are kept:
/// - `current`: the last requested state (what callers observe, and what the hash covers)
/// - `applied`: what the native side actually holds
///
/// They differ only in sub-states that were skipped: the depth function while depth
/// testing is off, and the blend function while blending is off.
#[derive(Debug, Clone)]
pub struct RenderStateCache {
    current: RenderState,
    applied: RenderState,
    hash: u32,
}

impl Default for RenderStateCache {
    fn default() -> Self {
        Self::with_state(RenderState::default())
    }
}

impl RenderStateCache {
    fn with_state(state: RenderState) -> Self {
        Self {
            current: state,
            applied: state,
            hash: state.hash(),
        }
    }

    /// Seeds the cache from native readback.
    ///
    /// Unknown enum codes keep the default value and are logged.
    pub fn from_native(api: &dyn GraphicsApi) -> Self {
        let defaults = RenderState::default();

        let depth_code = api.get_integer(StateQuery::DepthFunc);
        let depth_func = DepthFn::from_native(depth_code).unwrap_or_else(|| {
            log::warn!("unknown native depth function 0x{depth_code:04x}; assuming {:?}", defaults.depth_func);
            defaults.depth_func
        });

        let src = read_blend_factor(api, StateQuery::BlendSrc, defaults.blend_func.src);
        let dst = read_blend_factor(api, StateQuery::BlendDst, defaults.blend_func.dst);

        Self::with_state(RenderState {
            depth_test: api.is_enabled(Capability::DepthTest),
            depth_write: api.depth_write_mask(),
            depth_func,
            alpha_test: api.is_enabled(Capability::SampleAlphaToCoverage),
            blend: api.is_enabled(Capability::Blend),
            blend_func: BlendFn { src, dst },
            cull_face: api.is_enabled(Capability::CullFace),
            polygon_offset: api.is_enabled(Capability::PolygonOffsetFill),
        })
    }

    /// Last requested state.
    pub fn current(&self) -> &RenderState {
        &self.current
    }

    /// State the native side holds.
    pub fn applied(&self) -> &RenderState {
        &self.applied
    }

    /// Hash of [`current`](Self::current).
    pub fn hash(&self) -> u32 {
        self.hash
    }

    /// Brings native state in line with `requested`.
    ///
    /// Returns the number of native calls issued; zero when nothing differs.
    pub fn apply(&mut self, api: &mut dyn GraphicsApi, requested: &RenderState) -> usize {
        let applied = &mut self.applied;
        let mut calls = 0;

        calls += toggle(api, Capability::DepthTest, requested.depth_test, &mut applied.depth_test);
        if requested.depth_test && requested.depth_func != applied.depth_func {
            api.depth_func(requested.depth_func.to_native());
            applied.depth_func = requested.depth_func;
            calls += 1;
        }

        if requested.depth_write != applied.depth_write {
            api.depth_mask(requested.depth_write);
            applied.depth_write = requested.depth_write;
            calls += 1;
        }

        calls += toggle(
            api,
            Capability::SampleAlphaToCoverage,
            requested.alpha_test,
            &mut applied.alpha_test,
        );

        calls += toggle(api, Capability::Blend, requested.blend, &mut applied.blend);
        if requested.blend && requested.blend_func != applied.blend_func {
            let BlendFn { src, dst } = requested.blend_func;
            api.blend_func(src.to_native(), dst.to_native());
            applied.blend_func = requested.blend_func;
            calls += 1;
        }

        calls += toggle(api, Capability::CullFace, requested.cull_face, &mut applied.cull_face);
        calls += toggle(
            api,
            Capability::PolygonOffsetFill,
            requested.polygon_offset,
            &mut applied.polygon_offset,
        );

        self.current = *requested;
        self.hash = self.current.hash();
        calls
    }

    /// Turns the native depth write mask on if it is off. Clearing depth requires it.
    ///
    /// Only the native side changes; pair with [`restore_depth_write`](Self::restore_depth_write)
    /// once the clear is issued. Returns whether a call was made.
    pub fn force_depth_write(&mut self, api: &mut dyn GraphicsApi) -> bool {
        if self.applied.depth_write {
            return false;
        }
        api.depth_mask(true);
        self.applied.depth_write = true;
        true
    }

    /// Puts the native depth write mask back to the requested value.
    pub fn restore_depth_write(&mut self, api: &mut dyn GraphicsApi) {
        if self.applied.depth_write == self.current.depth_write {
            return;
        }
        api.depth_mask(self.current.depth_write);
        self.applied.depth_write = self.current.depth_write;
    }
}

fn toggle(api: &mut dyn GraphicsApi, cap: Capability, want: bool, have: &mut bool) -> usize {
    if want == *have {
        return 0;
    }
    api.set_enabled(cap, want);
    *have = want;
    1
}

fn read_blend_factor(api: &dyn GraphicsApi, query: StateQuery, fallback: BlendFactor) -> BlendFactor {
    let code = api.get_integer(query);
    BlendFactor::from_native(code).unwrap_or_else(|| {
        log::warn!("unknown native blend factor 0x{code:04x} for {query:?}; assuming {fallback:?}");
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::{Call, NativeState, RecordingApi, gl};

    fn alpha_blended() -> RenderState {
        RenderState::opaque()
            .with_depth_write(false)
            .with_blend(BlendFn::ALPHA)
    }

    // ── application ───────────────────────────────────────────────────────

    #[test]
    fn reapplying_same_state_emits_nothing() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let s = alpha_blended();
        assert!(cache.apply(&mut api, &s) > 0);
        api.clear_calls();

        assert_eq!(cache.apply(&mut api, &s), 0);
        assert!(api.calls().is_empty());
    }

    #[test]
    fn applied_state_reads_back_identically() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let s = alpha_blended().with_depth_func(DepthFn::LEqual).with_polygon_offset(true);
        cache.apply(&mut api, &s);

        let reread = RenderStateCache::from_native(&api);
        assert_eq!(*reread.current(), s);
        assert_eq!(reread.hash(), cache.hash());
    }

    #[test]
    fn emits_one_call_per_changed_field() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let calls = cache.apply(&mut api, &RenderState::default().with_cull_face(true));
        assert_eq!(calls, 1);
        assert_eq!(api.calls(), &[Call::SetEnabled(Capability::CullFace, true)]);
    }

    #[test]
    fn blend_toggle_follows_blend_flag() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        // depth test on, blending off: blending must stay disabled
        cache.apply(&mut api, &RenderState::default().with_depth_test(true));
        assert!(!api.calls().contains(&Call::SetEnabled(Capability::Blend, true)));
        assert!(!api.is_enabled(Capability::Blend));

        api.clear_calls();
        // blending on with depth test off: blending must turn on
        cache.apply(&mut api, &RenderState::default().with_blend(BlendFn::ADDITIVE));
        assert!(api.calls().contains(&Call::SetEnabled(Capability::Blend, true)));
        assert!(api.calls().contains(&Call::BlendFunc(gl::SRC_ALPHA, gl::ONE)));
    }

    #[test]
    fn depth_func_skipped_while_depth_test_off() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let off = RenderState::default().with_depth_func(DepthFn::Greater);
        cache.apply(&mut api, &off);
        assert!(!api.calls().iter().any(|c| matches!(c, Call::DepthFunc(_))));
        assert_eq!(cache.current().depth_func, DepthFn::Greater);
        assert_eq!(cache.applied().depth_func, DepthFn::Less);
    }

    #[test]
    fn stale_depth_func_is_applied_once_test_turns_on() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let x = RenderState::default().with_depth_test(true);
        let y = RenderState::default().with_depth_func(DepthFn::Greater);
        let z = y.with_depth_test(true);

        cache.apply(&mut api, &x);
        cache.apply(&mut api, &y);
        api.clear_calls();
        cache.apply(&mut api, &z);

        assert!(api.calls().contains(&Call::DepthFunc(gl::GREATER)));
        assert_eq!(api.get_integer(StateQuery::DepthFunc), gl::GREATER);
    }

    #[test]
    fn stale_blend_func_is_applied_once_blend_turns_on() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let pending = RenderState {
            blend_func: BlendFn::ALPHA,
            ..RenderState::default()
        };
        cache.apply(&mut api, &pending);
        assert_eq!(api.state_calls(), 0);

        cache.apply(&mut api, &RenderState { blend: true, ..pending });
        assert!(api.calls().contains(&Call::BlendFunc(gl::SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA)));
    }

    #[test]
    fn hash_tracks_requested_state() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        let s = RenderState::default().with_depth_func(DepthFn::Always);
        cache.apply(&mut api, &s);
        assert_eq!(cache.hash(), s.hash());
    }

    // ── readback ──────────────────────────────────────────────────────────

    #[test]
    fn readback_takes_depth_test_from_depth_capability() {
        let native = NativeState {
            depth_test: true,
            blend: false,
            depth_func: gl::GEQUAL,
            ..NativeState::default()
        };
        let api = RecordingApi::new().with_state(native);
        let cache = RenderStateCache::from_native(&api);

        assert!(cache.current().depth_test);
        assert!(!cache.current().blend);
        assert_eq!(cache.current().depth_func, DepthFn::GEqual);
    }

    #[test]
    fn readback_with_unknown_codes_keeps_defaults() {
        let native = NativeState {
            depth_func: 0xdead,
            blend_src: 0xbeef,
            ..NativeState::default()
        };
        let api = RecordingApi::new().with_state(native);
        let cache = RenderStateCache::from_native(&api);

        assert_eq!(cache.current().depth_func, DepthFn::Less);
        assert_eq!(cache.current().blend_func.src, BlendFactor::One);
    }

    #[test]
    fn round_trip_through_every_function_returns_to_start() {
        let a = alpha_blended().with_depth_func(DepthFn::LEqual);

        let mut others: Vec<RenderState> = DepthFn::ALL
            .into_iter()
            .flat_map(|f| {
                [
                    RenderState::default().with_depth_func(f),
                    RenderState::opaque().with_depth_func(f),
                ]
            })
            .collect();
        for src in BlendFactor::ALL {
            for dst in BlendFactor::ALL {
                let func = BlendFn { src, dst };
                others.push(RenderState::default().with_blend(func));
                others.push(RenderState {
                    blend_func: func,
                    ..RenderState::opaque()
                });
            }
        }

        for b in others {
            let mut api = RecordingApi::new();
            let mut cache = RenderStateCache::from_native(&api);

            cache.apply(&mut api, &a);
            cache.apply(&mut api, &b);
            cache.apply(&mut api, &a);

            assert_eq!(*cache.current(), a, "via {b:?}");
            assert_eq!(cache.hash(), a.hash(), "via {b:?}");
            assert_eq!(*cache.applied(), a, "via {b:?}");

            // Both toggles are on in `a`, so every native field reads back as `a`.
            let native = api.native_state();
            assert_eq!(native.depth_test, a.depth_test);
            assert_eq!(native.depth_write, a.depth_write);
            assert_eq!(native.depth_func, a.depth_func.to_native());
            assert_eq!(native.blend, a.blend);
            assert_eq!(native.blend_src, a.blend_func.src.to_native());
            assert_eq!(native.blend_dst, a.blend_func.dst.to_native());
            assert_eq!(native.cull_face, a.cull_face);
            assert_eq!(native.polygon_offset, a.polygon_offset);
        }
    }

    #[test]
    fn round_trip_with_toggles_off_leaves_native_functions_stale() {
        // Depth test and blending are off in `a`; its functions are never sent.
        let a = RenderState::default()
            .with_depth_func(DepthFn::Always)
            .with_depth_write(false);
        let b = RenderState::opaque().with_depth_func(DepthFn::Greater);

        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);
        cache.apply(&mut api, &a);
        cache.apply(&mut api, &b);
        cache.apply(&mut api, &a);

        assert_eq!(*cache.current(), a);
        assert_eq!(cache.hash(), a.hash());

        let native = api.native_state();
        assert!(!native.depth_test);
        assert!(!native.depth_write);
        assert!(!native.blend);
        // The native depth function still holds b's value.
        assert_eq!(native.depth_func, gl::GREATER);
        assert_eq!(cache.applied().depth_func, DepthFn::Greater);
    }

    #[test]
    fn force_depth_write_then_restore() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);
        let masked = RenderState::default().with_depth_write(false);
        cache.apply(&mut api, &masked);
        api.clear_calls();

        assert!(cache.force_depth_write(&mut api));
        assert_eq!(api.calls(), &[Call::DepthMask(true)]);
        assert!(!cache.current().depth_write);
        assert!(cache.applied().depth_write);
        assert_eq!(cache.hash(), masked.hash());

        api.clear_calls();
        cache.restore_depth_write(&mut api);
        assert_eq!(api.calls(), &[Call::DepthMask(false)]);
        assert!(!api.native_state().depth_write);
        assert_eq!(*cache.applied(), masked);
    }

    #[test]
    fn force_and_restore_are_silent_when_mask_is_on() {
        let mut api = RecordingApi::new();
        let mut cache = RenderStateCache::from_native(&api);

        assert!(!cache.force_depth_write(&mut api));
        cache.restore_depth_write(&mut api);
        assert!(api.calls().is_empty());
    }
}
