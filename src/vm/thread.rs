//! A thread of execution: its call stack and the fetch-decode-execute loop.

use std::rc::Rc;

use crate::vm::bytecode::{BytecodeReader, Instruction};
use crate::vm::class::{Class, Method};
use crate::vm::class_loader::ClassLoader;
use crate::vm::error::{Error, Result};
use crate::vm::frame::{Frame, Location};
use crate::vm::heap::Object;
use crate::vm::instructions::{self, Action, Env};
use crate::vm::local_variables::LocalVariables;
use crate::vm::native::{self, Console, NativeRegistry};
use crate::vm::operand_stack::OperandStack;
use crate::vm::sig;
use crate::vm::value::{Reference, Value};

/// Limits applied to a thread.
#[derive(Debug, Clone)]
pub struct Options {
    /// The number of frames past which an invocation fails with `StackOverflow`.
    pub max_call_depth: usize,
}

impl Default for Options {
    fn default() -> Self {
        Options { max_call_depth: 1024 }
    }
}

/// A single thread's call stack. The frame on top is the one executing, and its `pc` is the
/// thread's program counter.
#[derive(Debug)]
pub struct Thread {
    frames: Vec<Frame>,
    natives: NativeRegistry,
    console: Console,
    options: Options,
}

impl Thread {
    pub fn new(natives: NativeRegistry, console: Console) -> Self {
        Thread::with_options(natives, console, Options::default())
    }

    pub fn with_options(natives: NativeRegistry, console: Console, options: Options) -> Self {
        Thread {
            frames: vec![],
            natives: natives,
            console: console,
            options: options,
        }
    }

    pub fn push_frame(&mut self, frame: Frame) -> Result<()> {
        if self.frames.len() >= self.options.max_call_depth {
            return Err(Error::StackOverflow { depth: self.frames.len() });
        }
        debug!("pushing frame for {}.{}", frame.get_class().name(), frame.get_method().name());
        self.frames.push(frame);
        Ok(())
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub fn current_frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }

    /// The live frames, outermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// The program counter, read from the executing frame.
    pub fn pc(&self) -> Option<usize> {
        self.current_frame().map(|frame| frame.pc)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Initializes `class` if needed, then runs `method` with the given arguments (receiver first
    /// for instance methods) to completion, returning its result.
    pub fn invoke(&mut self, loader: &mut ClassLoader, class: &Rc<Class>, method: &Rc<Method>,
                  args: Vec<Value>) -> Result<Option<Value>> {
        self.initialize(loader, class)?;
        if method.is_native() || native::is_hooked(class) {
            let locals = LocalVariables::with_arguments(method.arg_slots(), args)?;
            let mut stack = OperandStack::new(2);
            let mut env = Env {
                loader: loader,
                natives: &self.natives,
                console: &mut self.console,
                callers: &self.frames,
            };
            native::invoke(&mut env, class, method, &locals, &mut stack, None)?;
            return if stack.is_empty() { Ok(None) } else { stack.pop().map(Some) };
        }
        let base = self.frames.len();
        self.push_frame(Frame::with_arguments(class.clone(), method.clone(), args)?)?;
        self.run_above(loader, base)
    }

    /// Runs `<clinit>` of `class` and its superclasses, outermost first, unless initialization
    /// has already begun.
    fn initialize(&mut self, loader: &mut ClassLoader, class: &Rc<Class>) -> Result<()> {
        let mut pending = vec![];
        let mut current = Some(class.clone());
        while let Some(class) = current {
            if class.is_initialized() {
                break;
            }
            current = class.superclass.clone();
            pending.push(class);
        }
        let clinit_sig = sig::Method {
            name: String::from("<clinit>"),
            params: vec![],
            return_ty: None,
        };
        for class in pending.into_iter().rev() {
            match class.get_method(&clinit_sig).cloned() {
                Some(clinit) => {
                    debug!("initializing class {}", class.name());
                    let base = self.frames.len();
                    self.push_frame(Frame::with_arguments(class.clone(), clinit, vec![])?)?;
                    class.mark_initialized();
                    self.run_above(loader, base)?;
                },
                None => class.mark_initialized(),
            }
        }
        Ok(())
    }

    /// Executes instructions until the call stack is empty. Returns the value returned by the
    /// outermost frame.
    pub fn run(&mut self, loader: &mut ClassLoader) -> Result<Option<Value>> {
        self.run_above(loader, 0)
    }

    /// Executes instructions until only `base` frames are left. Exceptions are not dispatched to
    /// the frames below `base`; they surface as `UncaughtException` instead.
    fn run_above(&mut self, loader: &mut ClassLoader, base: usize) -> Result<Option<Value>> {
        let mut result = None;
        while self.frames.len() > base {
            let (opcode, outcome) = self.step(loader);
            match outcome.and_then(|action| self.apply(loader, action, base)) {
                Ok(value) => result = value,
                Err(error) => self.handle_failure(loader, opcode, error, base)?,
            }
        }
        Ok(result)
    }

    /// Decodes and executes the instruction at the top frame's `pc`.
    fn step(&mut self, loader: &mut ClassLoader) -> (Option<u8>, Result<Action>) {
        let (frame, callers) = match self.frames.split_last_mut() {
            Some(split) => split,
            None => return (None, Ok(Action::Return(None))),
        };
        let mut reader = BytecodeReader::new(frame.code(), frame.pc);
        let (opcode, instruction) = match Instruction::fetch(&mut reader) {
            Ok(fetched) => fetched,
            Err(error) => return (None, Err(error)),
        };
        frame.next_pc = reader.position();
        trace!("{}.{} pc {}: 0x{:02x} {:?}", frame.get_class().name(), frame.get_method().name(),
               frame.pc, opcode, instruction);
        let mut env = Env {
            loader: loader,
            natives: &self.natives,
            console: &mut self.console,
            callers: callers,
        };
        (Some(opcode), instructions::execute(instruction, frame, &mut env))
    }

    /// Carries out what an instruction asked for. Returns the value of the frame just above
    /// `base` when it returns.
    fn apply(&mut self, loader: &mut ClassLoader, action: Action, base: usize)
            -> Result<Option<Value>> {
        match action {
            Action::Continue => {
                if let Some(frame) = self.frames.last_mut() {
                    frame.pc = frame.next_pc;
                }
                Ok(None)
            },
            Action::Invoke(frame) => {
                self.push_frame(frame)?;
                Ok(None)
            },
            Action::Initialize(frame) => {
                let class = frame.get_class().clone();
                self.push_frame(frame)?;
                class.mark_initialized();
                Ok(None)
            },
            Action::Return(value) => {
                if let Some(frame) = self.frames.pop() {
                    debug!("returning from {}.{}", frame.get_class().name(),
                           frame.get_method().name());
                }
                if self.frames.len() <= base {
                    return Ok(value);
                }
                match self.frames.last_mut() {
                    Some(caller) => {
                        caller.pc = caller.next_pc;
                        if let Some(value) = value {
                            caller.operand_stack.push(value)?;
                        }
                        Ok(None)
                    },
                    None => Ok(value),
                }
            },
            Action::Throw(exception) => {
                self.unwind(loader, exception, base)?;
                Ok(None)
            },
        }
    }

    /// Turns a guest-visible failure into an exception object and dispatches it. Any other
    /// failure, or one whose exception class is not loaded, aborts the thread.
    fn handle_failure(&mut self, loader: &mut ClassLoader, opcode: Option<u8>, error: Error,
                      base: usize) -> Result<()> {
        if let Error::Execution { .. } = error {
            self.frames.truncate(base);
            return Err(error);
        }
        if let Some(exception) = materialize(loader, &error)? {
            debug!("raising {} for {}", exception_class_name(&exception), error);
            return self.unwind(loader, exception, base);
        }
        if error.is_guest_visible() {
            warn!("no exception class is loaded for {}", error);
        }
        let error = self.with_context(opcode, error);
        self.frames.truncate(base);
        Err(error)
    }

    /// Attaches the current location and call stack to a failure.
    fn with_context(&self, opcode: Option<u8>, error: Error) -> Error {
        let mut locations = self.frames.iter().rev().map(Frame::location);
        match locations.next() {
            Some(location) => Error::Execution {
                opcode: opcode,
                location: location,
                backtrace: locations.collect(),
                cause: Box::new(error),
            },
            None => error,
        }
    }

    /// Pops frames (down to `base`) until one has a handler covering its `pc` that catches the
    /// exception's class, and transfers control there with the exception as the only operand.
    fn unwind(&mut self, loader: &mut ClassLoader, exception: Reference, base: usize)
            -> Result<()> {
        let class = exception.get_class().ok_or(Error::NullPointer)?;
        let backtrace: Vec<Location> = self.frames.iter().rev().map(Frame::location).collect();
        while self.frames.len() > base {
            let frame = match self.frames.last_mut() {
                Some(frame) => frame,
                None => break,
            };
            if let Some(handler_pc) = find_handler(loader, frame, &class)? {
                debug!("caught {} at {} (handler pc {})", class.name(), frame.location(),
                       handler_pc);
                frame.operand_stack.clear();
                frame.operand_stack.push_reference(exception)?;
                frame.pc = handler_pc;
                return Ok(());
            }
            debug!("unwinding {}", frame.location());
            self.frames.pop();
        }
        warn!("uncaught exception {}", class.name());
        let cause = Error::UncaughtException {
            class: class.symref.sig.java_name(),
            message: detail_message(&exception),
        };
        let mut locations = backtrace.into_iter();
        Err(match locations.next() {
            Some(location) => Error::Execution {
                opcode: None,
                location: location,
                backtrace: locations.collect(),
                cause: Box::new(cause),
            },
            None => cause,
        })
    }
}

/// Returns the handler in `frame` for an exception of class `class` thrown at its `pc`. A catch
/// type naming a class that is not loaded matches nothing.
fn find_handler(loader: &mut ClassLoader, frame: &Frame, class: &Rc<Class>)
        -> Result<Option<usize>> {
    for entry in frame.exception_table() {
        if frame.pc < entry.start_pc as usize || frame.pc >= entry.end_pc as usize {
            continue;
        }
        if entry.catch_type == 0 {
            return Ok(Some(entry.handler_pc as usize));
        }
        let symref = frame.get_class().get_constant_pool().class_ref(entry.catch_type)?;
        let catch_class = match loader.resolve_class(symref) {
            Ok(catch_class) => catch_class,
            Err(Error::ClassNotFound(_)) => continue,
            Err(error) => return Err(error),
        };
        if class.is_assignable_to(&catch_class) {
            return Ok(Some(entry.handler_pc as usize));
        }
    }
    Ok(None)
}

/// Creates the guest exception object for a failure when its class has been defined, filling in
/// `detailMessage` where the class declares it.
fn materialize(loader: &mut ClassLoader, error: &Error) -> Result<Option<Reference>> {
    let class = match error.guest_class_name().and_then(|name| loader.find_class(name)) {
        Some(class) => class,
        None => return Ok(None),
    };
    let mut object = Object::new(class);
    if let Some(message) = error.guest_message() {
        if object.has_field("detailMessage") {
            let message = loader.new_string(&message)?;
            object.put_field("detailMessage", Value::Reference(message))?;
        }
    }
    Ok(Some(Reference::new_object(object)))
}

fn exception_class_name(exception: &Reference) -> String {
    exception.get_class().map_or_else(String::new, |class| class.name())
}

fn detail_message(exception: &Reference) -> Option<String> {
    match *exception {
        Reference::Object(ref object) => match object.borrow().get_field("detailMessage") {
            Ok(Value::Reference(message)) => message.as_rust_string(),
            _ => None,
        },
        _ => None,
    }
}
