//! The RSP command queue.
//!
//! Commands submitted during a frame are buffered until [RspQueue::detach_show], which
//! interprets them against the current contents of RDRAM. Blocks are recorded command
//! lists that can be replayed any number of times; a replay is a display list call, so
//! every memory reference inside a block is read again on each run.

use core::slice;

use fast3d::{
    cmd::F3DCommand,
    decode::{decode_f3d_display_list, F3DCommandIter, RawF3DCommand},
    interpret::F3DMemory,
};
use tracing::{debug, info};

use crate::{display::Surface, MemoryError, Rdram, SysError};

/// A pointer as it appears in a queued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pointer {
    /// An RDRAM address.
    Rdram(u32),
    /// A recorded block, called as a display list.
    Block(u32),
}

impl Pointer {
    pub fn rdram(self) -> Result<u32, MemoryError> {
        match self {
            Pointer::Rdram(addr) => Ok(addr),
            Pointer::Block(id) => Err(MemoryError::InvalidBlock(id)),
        }
    }
}

/// Handle to a recorded command block.
///
/// Not `Clone`: a block is freed by giving its handle back to [RspQueue::block_free].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct Block {
    id: u32,
}

impl Block {
    pub fn id(&self) -> u32 {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RspqStats {
    pub blocks_recorded: u64,
    pub blocks_run: u64,
    pub commands_submitted: u64,
    pub frames_flushed: u64,
}

#[derive(Debug)]
pub struct RspQueue {
    pub(crate) rdram: Rdram,
    pub(crate) frame: Vec<F3DCommand<Pointer>>,
    recording: Option<Vec<F3DCommand<Pointer>>>,
    blocks: Vec<Option<Vec<F3DCommand<Pointer>>>>,
    pub(crate) attached: Option<Surface>,
    pub(crate) attached_depth: Option<Surface>,
    pub(crate) stats: RspqStats,
}

impl RspQueue {
    /// Takes ownership of RDRAM and starts an empty queue.
    pub fn init(rdram: Rdram) -> Self {
        info!("rspq: init ({} bytes of RDRAM)", rdram.size());
        Self {
            rdram,
            frame: Vec::new(),
            recording: None,
            blocks: Vec::new(),
            attached: None,
            attached_depth: None,
            stats: RspqStats::default(),
        }
    }

    pub fn rdram(&self) -> &Rdram {
        &self.rdram
    }

    pub fn rdram_mut(&mut self) -> &mut Rdram {
        &mut self.rdram
    }

    pub fn stats(&self) -> RspqStats {
        self.stats
    }

    /// The color surface attached by [RspQueue::attach], if any.
    pub fn attached_color(&self) -> Option<Surface> {
        self.attached
    }

    /// The depth surface attached by [RspQueue::attach], if any.
    pub fn attached_depth(&self) -> Option<Surface> {
        self.attached_depth
    }

    pub fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    /// Appends a command to the block being recorded, or to the current frame.
    pub fn submit(&mut self, cmd: F3DCommand<Pointer>) {
        self.stats.commands_submitted += 1;
        match self.recording.as_mut() {
            Some(block) => block.push(cmd),
            None => self.frame.push(cmd),
        }
    }

    /// Starts recording a block. Blocks cannot be nested.
    pub fn block_begin(&mut self) {
        assert!(
            self.recording.is_none(),
            "rspq_block_begin: a block is already being recorded"
        );
        self.recording = Some(Vec::new());
    }

    /// Finishes the block started by [RspQueue::block_begin].
    pub fn block_end(&mut self) -> Block {
        let mut cmds = self
            .recording
            .take()
            .expect("rspq_block_end: no block is being recorded");
        cmds.push(F3DCommand::SPEndDisplayList);

        let id = self.blocks.len() as u32;
        debug!("rspq: recorded block {} ({} commands)", id, cmds.len());
        self.blocks.push(Some(cmds));
        self.stats.blocks_recorded += 1;
        Block { id }
    }

    /// Queues a call to a recorded block.
    pub fn block_run(&mut self, block: &Block) {
        self.submit(F3DCommand::SPDisplayList(Pointer::Block(block.id)));
        self.stats.blocks_run += 1;
    }

    pub fn block_free(&mut self, block: Block) {
        if let Some(slot) = self.blocks.get_mut(block.id as usize) {
            debug!("rspq: freed block {}", block.id);
            *slot = None;
        }
    }

    /// Takes the commands queued for the current frame.
    pub(crate) fn take_frame(&mut self) -> Vec<F3DCommand<Pointer>> {
        self.stats.frames_flushed += 1;
        std::mem::take(&mut self.frame)
    }
}

impl F3DMemory for RspQueue {
    type Ptr = Pointer;
    type Error = SysError;
    type DlIter<'a> = DlIter<'a> where Self: 'a;

    fn root_dl(&self) -> Result<Self::DlIter<'_>, Self::Error> {
        Ok(DlIter::FromBuffer(self.frame.iter()))
    }

    fn read_dl(&self, ptr: Self::Ptr) -> Result<Self::DlIter<'_>, Self::Error> {
        match ptr {
            Pointer::Block(id) => {
                let cmds = self
                    .blocks
                    .get(id as usize)
                    .and_then(|block| block.as_ref())
                    .ok_or(MemoryError::InvalidBlock(id))?;
                Ok(DlIter::FromBuffer(cmds.iter()))
            }
            Pointer::Rdram(addr) => {
                let raw = RawDlIter {
                    rdram: &self.rdram,
                    addr,
                };
                Ok(DlIter::FromRaw(decode_f3d_display_list(raw)))
            }
        }
    }

    fn read_u8(&self, dst: &mut [u8], ptr: Self::Ptr, offset: usize) -> Result<(), Self::Error> {
        self.rdram.read_u8s(ptr.rdram()? + offset as u32, dst)?;
        Ok(())
    }

    fn read_u16(&self, dst: &mut [u16], ptr: Self::Ptr, offset: usize) -> Result<(), Self::Error> {
        self.rdram.read_u16s(ptr.rdram()? + offset as u32, dst)?;
        Ok(())
    }

    fn read_u32(&self, dst: &mut [u32], ptr: Self::Ptr, offset: usize) -> Result<(), Self::Error> {
        self.rdram.read_u32s(ptr.rdram()? + offset as u32, dst)?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum DlIter<'a> {
    FromBuffer(slice::Iter<'a, F3DCommand<Pointer>>),
    FromRaw(F3DCommandIter<RawDlIter<'a>>),
}

impl<'a> Iterator for DlIter<'a> {
    type Item = Result<F3DCommand<Pointer>, SysError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            DlIter::FromBuffer(iter) => iter.next().copied().map(Ok),
            DlIter::FromRaw(iter) => iter.next(),
        }
    }
}

/// Reads command words from a display list stored in RDRAM.
#[derive(Debug)]
pub struct RawDlIter<'a> {
    rdram: &'a Rdram,
    addr: u32,
}

impl<'a> RawDlIter<'a> {
    fn next_impl(&mut self) -> Result<RawF3DCommand<Pointer>, SysError> {
        let mut words = [0; 2];
        self.rdram.read_u32s(self.addr, &mut words)?;
        self.addr += 8;

        let [w0, w1] = words;
        Ok(RawF3DCommand {
            w0,
            w1,
            w1_ptr: Pointer::Rdram(w1),
        })
    }
}

impl<'a> Iterator for RawDlIter<'a> {
    type Item = Result<RawF3DCommand<Pointer>, SysError>;

    fn next(&mut self) -> Option<Self::Item> {
        Some(self.next_impl())
    }
}

#[cfg(test)]
mod test {
    use fast3d::{cmd::*, encode::encode_f3d_command};

    use super::*;

    fn queue() -> RspQueue {
        RspQueue::init(Rdram::new(0x10000))
    }

    #[test]
    fn test_block_records_and_replays() {
        let mut rspq = queue();
        rspq.block_begin();
        rspq.submit(F3DCommand::DPPipeSync);
        let block = rspq.block_end();
        assert!(rspq.frame.is_empty());

        rspq.block_run(&block);
        rspq.block_run(&block);

        let stats = rspq.stats();
        assert_eq!(stats.blocks_recorded, 1);
        assert_eq!(stats.blocks_run, 2);

        let cmds: Vec<_> = rspq
            .read_dl(Pointer::Block(block.id()))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            cmds,
            vec![F3DCommand::DPPipeSync, F3DCommand::SPEndDisplayList]
        );
    }

    #[test]
    fn test_freed_block_is_invalid() {
        let mut rspq = queue();
        rspq.block_begin();
        let block = rspq.block_end();
        let id = block.id();
        rspq.block_free(block);
        assert_eq!(
            rspq.read_dl(Pointer::Block(id)).err(),
            Some(SysError::Memory(MemoryError::InvalidBlock(id)))
        );
    }

    #[test]
    #[should_panic]
    fn test_nested_block_begin() {
        let mut rspq = queue();
        rspq.block_begin();
        rspq.block_begin();
    }

    #[test]
    #[should_panic]
    fn test_block_end_without_begin() {
        let mut rspq = queue();
        rspq.block_end();
    }

    #[test]
    fn test_read_display_list_from_rdram() {
        let mut rspq = queue();
        let addr = rspq.rdram_mut().alloc(24, 8).unwrap();
        let mut words = Vec::new();
        for cmd in [
            F3DCommand::SPSetGeometryMode(GeometryModes::ZBUFFER),
            F3DCommand::SPEndDisplayList,
            F3DCommand::DPFullSync,
        ] {
            words.extend(encode_f3d_command(cmd));
        }
        rspq.rdram_mut().write_u32s(addr, &words).unwrap();

        let cmds: Vec<_> = rspq
            .read_dl(Pointer::Rdram(addr))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            cmds,
            vec![
                F3DCommand::SPSetGeometryMode(GeometryModes::ZBUFFER),
                F3DCommand::SPEndDisplayList,
            ]
        );
    }
}
