//   Copyright (c) 2024-2026 Anton Kundenko <singaraiona@gmail.com>
//   All rights reserved.
//
//   Permission is hereby granted, free of charge, to any person obtaining a copy
//   of this software and associated documentation files (the "Software"), to deal
//   in the Software without restriction, including without limitation the rights
//   to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
//   copies of the Software, and to permit persons to whom the Software is
//   furnished to do so, subject to the following conditions:
//
//   The above copyright notice and this permission notice shall be included in all
//   copies or substantial portions of the Software.
//
//   THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
//   IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
//   FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
//   AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
//   LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
//   OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
//   SOFTWARE.

//! Server lifecycle: `start()` binds and submits the reactor, the request
//! workers, and the response writer to the pool; `wait()` joins it;
//! `stop()` raises the stopping flag the loops observe between iterations.

use std::os::unix::io::AsRawFd;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::net::{ClientId, ClientSocket, Queue, Reactor, ServerSocket};
use crate::registry::ClientRegistry;

type RequestItem = (ClientId, Vec<u8>);
type ResponseItem = (ClientId, Vec<u8>);

pub struct Server {
    port: u16,
    request_workers: usize,
    started: AtomicBool,
    stop: Arc<AtomicBool>,
    pool: crate::pool::Pool,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<Dispatcher>,
    request_queue: Arc<Queue<RequestItem>>,
    response_queue: Arc<Queue<ResponseItem>>,
}

impl Server {
    pub fn new(port: u16, request_workers: usize) -> Self {
        Server {
            port,
            request_workers,
            started: AtomicBool::new(false),
            stop: Arc::new(AtomicBool::new(false)),
            pool: crate::pool::Pool::new(),
            registry: Arc::new(ClientRegistry::new()),
            dispatcher: Arc::new(Dispatcher::new()),
            request_queue: Arc::new(Queue::new()),
            response_queue: Arc::new(Queue::new()),
        }
    }

    pub fn start(&self) -> Result<()> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let socket = ServerSocket::bind(self.port)?;
        tracing::info!(port = self.port, "listening");

        {
            let stop = Arc::clone(&self.stop);
            let registry = Arc::clone(&self.registry);
            let dispatcher = Arc::clone(&self.dispatcher);
            let request_queue = Arc::clone(&self.request_queue);
            self.pool.submit("reactor", move || {
                if let Err(e) = reactor_loop(socket, stop, registry, dispatcher, request_queue) {
                    tracing::error!(error = %e, "reactor loop exited");
                }
            });
        }

        for i in 0..self.request_workers {
            let stop = Arc::clone(&self.stop);
            let request_queue = Arc::clone(&self.request_queue);
            let response_queue = Arc::clone(&self.response_queue);
            let dispatcher = Arc::clone(&self.dispatcher);
            self.pool.submit(format!("request-worker-{i}"), move || {
                worker_loop(stop, request_queue, response_queue, dispatcher);
            });
        }

        {
            let stop = Arc::clone(&self.stop);
            let response_queue = Arc::clone(&self.response_queue);
            let registry = Arc::clone(&self.registry);
            let dispatcher = Arc::clone(&self.dispatcher);
            self.pool.submit("response-writer", move || {
                writer_loop(stop, response_queue, registry, dispatcher);
            });
        }

        Ok(())
    }

    pub fn wait(&self) {
        self.pool.join();
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn reactor_loop(
    socket: ServerSocket,
    stop: Arc<AtomicBool>,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<Dispatcher>,
    request_queue: Arc<Queue<RequestItem>>,
) -> Result<()> {
    let mut reactor = Reactor::new()?;
    let listener_fd = socket.fd();
    let pending_accepts: Arc<Mutex<Vec<ClientId>>> = Arc::new(Mutex::new(Vec::new()));
    let pending_drops: Arc<Mutex<Vec<ClientId>>> = Arc::new(Mutex::new(Vec::new()));

    let socket = Mutex::new(socket);
    {
        let registry = Arc::clone(&registry);
        let pending_accepts = Arc::clone(&pending_accepts);
        reactor.add(
            listener_fd,
            Box::new(move |_fd| {
                let mut socket = socket.lock().unwrap();
                loop {
                    match socket.mio_listener().accept() {
                        Ok((stream, _addr)) => {
                            let client_id = stream.as_raw_fd();
                            match ClientSocket::from_accepted(stream) {
                                Ok(client_socket) => {
                                    registry.insert(client_id, client_socket);
                                    pending_accepts.lock().unwrap().push(client_id);
                                    tracing::info!(client = client_id, "accepted connection");
                                }
                                Err(e) => {
                                    tracing::warn!(error = %e, "failed to prepare accepted socket")
                                }
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            break;
                        }
                    }
                }
            }),
        )?;
    }

    while !stop.load(Ordering::Acquire) {
        let os_dead = reactor.wait()?;

        for client_id in std::mem::take(&mut *pending_accepts.lock().unwrap()) {
            let registry = Arc::clone(&registry);
            let request_queue = Arc::clone(&request_queue);
            let pending_drops = Arc::clone(&pending_drops);
            reactor.add(
                client_id,
                Box::new(move |fd| match registry.recv(fd) {
                    Some(Ok(bytes)) => {
                        if !bytes.is_empty() {
                            request_queue.push((fd, bytes));
                        }
                    }
                    Some(Err(_)) | None => {
                        pending_drops.lock().unwrap().push(fd);
                    }
                }),
            )?;
        }

        let mut dead = os_dead;
        dead.extend(std::mem::take(&mut *pending_drops.lock().unwrap()));
        for client_id in dead {
            reactor.remove(client_id);
            if registry.remove(client_id).is_some() {
                tracing::info!(client = client_id, "dropped connection");
                dispatcher.on_disconnect(client_id);
            }
        }
    }
    Ok(())
}

fn worker_loop(
    stop: Arc<AtomicBool>,
    request_queue: Arc<Queue<RequestItem>>,
    response_queue: Arc<Queue<ResponseItem>>,
    dispatcher: Arc<Dispatcher>,
) {
    while !stop.load(Ordering::Acquire) {
        let (client_id, bytes) = request_queue.wait_pop();
        let reply_bytes = dispatcher.handle(client_id, &bytes);
        response_queue.push((client_id, reply_bytes));
    }
}

fn writer_loop(
    stop: Arc<AtomicBool>,
    response_queue: Arc<Queue<ResponseItem>>,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<Dispatcher>,
) {
    while !stop.load(Ordering::Acquire) {
        let (client_id, bytes) = response_queue.wait_pop();
        match registry.send(client_id, &bytes) {
            Some(Ok(())) => {}
            Some(Err(_)) | None => {
                if registry.remove(client_id).is_some() {
                    dispatcher.on_disconnect(client_id);
                }
            }
        }
    }
}
