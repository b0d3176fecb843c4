use crate::gfx::api::{BufferHandle, BufferKind, BufferUsage, GraphicsApi};

use super::error::{ParamError, check_identifier};
use super::layout::ParamLayout;
use super::types::ParamValue;

/// A named uniform block: a [`ParamLayout`] plus its backing bytes.
///
/// The GPU buffer is created on the first [`sync`](Self::sync) and bound to
/// [`slot`](Self::slot), which the registry assigns at registration.
#[derive(Debug)]
pub struct ParamBuffer {
    name: String,
    layout: ParamLayout,
    data: Vec<u8>,
    usage: BufferUsage,
    slot: u32,
    handle: Option<BufferHandle>,
    dirty: bool,
}

impl ParamBuffer {
    pub fn new(
        name: impl Into<String>,
        layout: ParamLayout,
        usage: BufferUsage,
    ) -> Result<Self, ParamError> {
        let name = name.into();
        check_identifier(&name)?;

        let data = vec![0; layout.size()];
        Ok(Self {
            name,
            layout,
            data,
            usage,
            slot: 0,
            handle: None,
            dirty: true,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn layout(&self) -> &ParamLayout {
        &self.layout
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// Uniform binding slot.
    pub fn slot(&self) -> u32 {
        self.slot
    }

    pub(crate) fn set_slot(&mut self, slot: u32) {
        self.slot = slot;
    }

    pub fn handle(&self) -> Option<BufferHandle> {
        self.handle
    }

    /// True when the bytes changed since the last upload.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Resolves a parameter name once, for repeated [`set_at`](Self::set_at) calls.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.layout.index_of(name)
    }

    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        let index = self.layout.index_of(name).ok_or_else(|| self.unknown(name))?;
        self.set_at(index, value)
    }

    pub fn set_at(&mut self, index: usize, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        let value = value.into();
        let decl = self.layout.param(index).ok_or_else(|| ParamError::IndexOutOfRange {
            buffer: self.name.clone(),
            index,
        })?;

        if decl.ty != value.ty() {
            return Err(ParamError::TypeMismatch {
                name: decl.name.clone(),
                expected: decl.ty,
                found: value.ty(),
            });
        }

        let bytes = value.bytes();
        let start = decl.offset;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        self.dirty = true;
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<ParamValue, ParamError> {
        let index = self.layout.index_of(name).ok_or_else(|| self.unknown(name))?;
        self.get_at(index)
    }

    pub fn get_at(&self, index: usize) -> Result<ParamValue, ParamError> {
        let decl = self.layout.param(index).ok_or_else(|| ParamError::IndexOutOfRange {
            buffer: self.name.clone(),
            index,
        })?;
        Ok(ParamValue::read(decl.ty, &self.data[decl.offset..]))
    }

    /// Uploads the whole backing store, creating and binding the GPU buffer on first use.
    pub fn sync(&mut self, api: &mut dyn GraphicsApi) {
        let handle = match self.handle {
            Some(h) => h,
            None => {
                let h = api.create_buffer(BufferKind::Uniform);
                api.bind_buffer_base(self.slot, h);
                self.handle = Some(h);
                h
            }
        };

        api.upload_buffer(handle, &self.data, self.usage);
        self.dirty = false;
    }

    /// Syncs only when dirty. Returns whether an upload happened.
    pub fn sync_if_dirty(&mut self, api: &mut dyn GraphicsApi) -> bool {
        if !self.dirty {
            return false;
        }
        self.sync(api);
        true
    }

    /// Deletes the GPU buffer. A later sync recreates it.
    pub fn release(&mut self, api: &mut dyn GraphicsApi) {
        if let Some(h) = self.handle.take() {
            api.delete_buffer(h);
        }
        self.dirty = true;
    }

    fn unknown(&self, name: &str) -> ParamError {
        ParamError::UnknownParam {
            buffer: self.name.clone(),
            name: name.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::api::{Call, RecordingApi};
    use crate::gfx::param::ParamType;
    use glam::{Vec3, Vec4};

    fn sun() -> ParamBuffer {
        let layout = ParamLayout::builder()
            .vec3("Direction")
            .vec4("Color")
            .vec4("ShadowColor")
            .float("Brightness")
            .build()
            .unwrap();
        ParamBuffer::new("Sun", layout, BufferUsage::Static).unwrap()
    }

    // ── access ────────────────────────────────────────────────────────────

    #[test]
    fn set_writes_at_std140_offset() {
        let mut buf = sun();
        buf.set("Brightness", 3.0f32).unwrap();
        assert_eq!(&buf.bytes()[48..52], &3.0f32.to_ne_bytes());
        assert_eq!(buf.get("Brightness").unwrap(), ParamValue::Float(3.0));
    }

    #[test]
    fn set_at_uses_resolved_index() {
        let mut buf = sun();
        let color = buf.index_of("Color").unwrap();
        buf.set_at(color, Vec4::new(1.0, 0.9, 0.7, 1.0)).unwrap();
        assert_eq!(
            buf.get("Color").unwrap(),
            ParamValue::Vec4(Vec4::new(1.0, 0.9, 0.7, 1.0))
        );
    }

    #[test]
    fn mismatched_kind_is_rejected() {
        let mut buf = sun();
        let err = buf.set("Direction", 1.0f32).unwrap_err();
        assert_eq!(
            err,
            ParamError::TypeMismatch {
                name: "Direction".into(),
                expected: ParamType::Vec3,
                found: ParamType::Float,
            }
        );
        assert!(buf.bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn unknown_name_is_rejected() {
        let mut buf = sun();
        assert!(matches!(
            buf.set("Nope", Vec3::ZERO),
            Err(ParamError::UnknownParam { .. })
        ));
        assert!(matches!(buf.get_at(9), Err(ParamError::IndexOutOfRange { index: 9, .. })));
    }

    // ── sync ──────────────────────────────────────────────────────────────

    #[test]
    fn first_sync_creates_and_binds() {
        let mut api = RecordingApi::new();
        let mut buf = sun();
        buf.set_slot(2);
        buf.sync(&mut api);

        let h = buf.handle().unwrap();
        assert_eq!(
            api.calls(),
            &[
                Call::CreateBuffer(h, BufferKind::Uniform),
                Call::BindBufferBase(2, h),
                Call::UploadBuffer {
                    buffer: h,
                    len: 64,
                    usage: BufferUsage::Static
                },
            ]
        );
        assert!(!buf.is_dirty());
    }

    #[test]
    fn clean_buffer_skips_upload() {
        let mut api = RecordingApi::new();
        let mut buf = sun();
        assert!(buf.sync_if_dirty(&mut api));
        api.clear_calls();

        assert!(!buf.sync_if_dirty(&mut api));
        assert!(api.calls().is_empty());

        buf.set("Brightness", 2.0f32).unwrap();
        assert!(buf.sync_if_dirty(&mut api));
        assert_eq!(api.calls().len(), 1);
    }

    #[test]
    fn release_deletes_buffer() {
        let mut api = RecordingApi::new();
        let mut buf = sun();
        buf.sync(&mut api);
        let h = buf.handle().unwrap();

        buf.release(&mut api);
        assert_eq!(api.calls().last(), Some(&Call::DeleteBuffer(h)));
        assert!(buf.handle().is_none());
    }
}
