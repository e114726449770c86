// 该文件是 Kanjian （看见） 项目的一部分。
// src/task.rs - 推理任务
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Kanjian contributors

use std::{
  sync::atomic::{AtomicBool, Ordering},
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{model::Model, output::Render};

const DEFAULT_REPEAT_TIMES: usize = 1000;
// 前两次推理包含预热开销，不计入平均值
const WARMUP_TIMES: usize = 2;

// 中断处理器在进程内只能注册一次，所有连续任务共用同一个中断标志
static HANDLER_INSTALLED: AtomicBool = AtomicBool::new(false);
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn request_interrupt() {
  INTERRUPTED.store(true, Ordering::SeqCst);
}

fn install_interrupt_handler() -> Result<(), ctrlc::Error> {
  if HANDLER_INSTALLED.swap(true, Ordering::SeqCst) {
    return Ok(());
  }

  let handler = ctrlc::set_handler(|| {
    info!("收到中断信号，准备退出...");
    request_interrupt();
    thread::spawn(|| {
      thread::sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  });
  match handler {
    Ok(()) => Ok(()),
    Err(ctrlc::Error::MultipleHandlers) => {
      warn!("中断信号处理器已由其他组件注册，Ctrl-C 不会停止任务循环");
      Ok(())
    }
    Err(e) => {
      HANDLER_INSTALLED.store(false, Ordering::SeqCst);
      Err(e)
    }
  }
}

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始后处理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    let elapsed = now.elapsed();
    info!("后处理完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复执行后处理，报告平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      repeat_times: DEFAULT_REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    self.repeat_times = repeat_times;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始后处理...");
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})后处理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      info!("({})渲染完成，耗时: {:.2?}", i, now.elapsed());
      times.push(elapsed);
    }

    if times.len() > WARMUP_TIMES {
      warn!(
        "平均后处理时间: {:.2?}",
        times.iter().skip(WARMUP_TIMES).sum::<Duration>() / (times.len() - WARMUP_TIMES) as u32
      );
    } else {
      warn!("重复次数不足 {}，不计算平均时间", WARMUP_TIMES + 1);
    }

    Ok(())
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for ContinuousTask
{
  type Error = anyhow::Error;

  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    install_interrupt_handler()?;
    // 上一个任务留下的中断不影响本次任务
    INTERRUPTED.store(false, Ordering::SeqCst);

    let mut frame_index: usize = 0;
    let mut now = Instant::now();
    for frame in input {
      frame_index = frame_index.wrapping_add(1);
      info!("处理第 {} 帧", frame_index);
      let result = model.infer(&frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      info!("后处理完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| frame_index >= n) {
        info!("达到指定帧数 {}, 退出任务循环", frame_index);
        break;
      }
      if INTERRUPTED.load(Ordering::SeqCst) {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    info!("任务完成，退出");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::{cell::RefCell, rc::Rc};

  struct Doubler;

  impl Model for Doubler {
    type Input = u32;
    type Output = u32;
    type Error = std::io::Error;

    fn infer(&self, input: &u32) -> Result<u32, Self::Error> {
      if *input == u32::MAX {
        return Err(std::io::Error::other("bad frame"));
      }
      Ok(input * 2)
    }
  }

  #[derive(Clone, Default)]
  struct Recorder(Rc<RefCell<Vec<(u32, u32)>>>);

  impl Render<u32, u32> for Recorder {
    type Error = std::io::Error;

    fn render_result(&self, frame: &u32, result: &u32) -> Result<(), Self::Error> {
      self.0.borrow_mut().push((*frame, *result));
      Ok(())
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let recorder = Recorder::default();
    OneShotTask
      .run_task(vec![3u32, 4].into_iter(), Doubler, recorder.clone())
      .unwrap();
    assert_eq!(*recorder.0.borrow(), vec![(3u32, 6u32)]);
  }

  #[test]
  fn one_shot_without_frames_fails() {
    let result = OneShotTask.run_task(std::iter::empty::<u32>(), Doubler, Recorder::default());
    assert!(result.is_err());
  }

  #[test]
  fn repeat_shot_repeats_same_frame() {
    let recorder = Recorder::default();
    RepeatShotTask::default()
      .with_repeat_times(5)
      .run_task(vec![1u32, 9].into_iter(), Doubler, recorder.clone())
      .unwrap();
    assert_eq!(*recorder.0.borrow(), vec![(1u32, 2u32); 5]);

    // 次数过少时不计算平均值
    RepeatShotTask::default()
      .with_repeat_times(1)
      .run_task(vec![1u32].into_iter(), Doubler, Recorder::default())
      .unwrap();
  }

  /// 处理到指定帧时模拟收到 Ctrl-C
  struct InterruptAt(u32);

  impl Model for InterruptAt {
    type Input = u32;
    type Output = u32;
    type Error = std::io::Error;

    fn infer(&self, input: &u32) -> Result<u32, Self::Error> {
      if *input == self.0 {
        request_interrupt();
      }
      Ok(*input)
    }
  }

  // 连续任务共用进程内的中断标志，放在同一个测试中顺序执行
  #[test]
  fn continuous_stops_at_frame_number_and_propagates_errors() {
    let recorder = Recorder::default();
    ContinuousTask::default()
      .with_frame_number(Some(2))
      .run_task(vec![1u32, 2, 3].into_iter(), Doubler, recorder.clone())
      .unwrap();
    assert_eq!(*recorder.0.borrow(), vec![(1u32, 2u32), (2, 4)]);

    let recorder = Recorder::default();
    let result = ContinuousTask::default().run_task(
      vec![1u32, u32::MAX, 3].into_iter(),
      Doubler,
      recorder.clone(),
    );
    assert!(result.is_err());
    assert_eq!(*recorder.0.borrow(), vec![(1u32, 2u32)]);

    // 之后再运行的任务同样能被中断
    for _ in 0..2 {
      let recorder = Recorder::default();
      ContinuousTask::default()
        .run_task(vec![1u32, 2, 3, 4].into_iter(), InterruptAt(2), recorder.clone())
        .unwrap();
      assert_eq!(*recorder.0.borrow(), vec![(1u32, 1u32), (2, 2)]);
    }
  }
}
